use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Ported from `FileWatch`: holds a path and the last observed modification
/// time, and rate-limits its own re-stat to once per `CHECK_INTERVAL` so
/// polling it every frame is free between checks.
pub struct FileWatch {
    path: PathBuf,
    last_checked: Instant,
    last_modified: Option<SystemTime>,
}

pub const CHECK_INTERVAL: Duration = Duration::from_millis(500);

impl FileWatch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = Self::stat(&path);
        Self {
            path,
            last_checked: Instant::now(),
            last_modified,
        }
    }

    fn stat(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` exactly when the file's mtime changed since the last
    /// check *and* at least `CHECK_INTERVAL` has elapsed since the previous
    /// check. Calling this in a tight loop only re-stats the filesystem once
    /// every 500ms, matching the original's rate limiter.
    pub fn check(&mut self) -> bool {
        if self.last_checked.elapsed() < CHECK_INTERVAL {
            return false;
        }
        self.last_checked = Instant::now();
        let modified = Self::stat(&self.path);
        if modified != self.last_modified {
            self.last_modified = modified;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn unchanged_file_reports_no_change_within_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "v1").unwrap();
        let mut watch = FileWatch::new(file.path());
        assert!(!watch.check());
    }
}
