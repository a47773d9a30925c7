//! The windowing collaborator's boundary contract: `size`, `is_open`,
//! `on_resize`, `poll_events`, and the native handle pair a real backend would
//! use to create a swap chain. Narrowed to exactly the surface this crate's
//! core needs: no event types, no input, no OS service beyond these five
//! calls.

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

pub trait Window {
    fn size(&self) -> (u32, u32);
    fn is_open(&self) -> bool;

    /// Registers a callback invoked the next time `poll_events` observes a
    /// size change. Only one callback is kept; a later call replaces it.
    fn on_resize(&mut self, callback: Box<dyn FnMut(u32, u32)>);

    /// Pumps whatever event source backs this window, firing the `on_resize`
    /// callback for any resize observed during the call.
    fn poll_events(&mut self);

    fn raw_window_handle(&self) -> RawWindowHandle;
    fn raw_display_handle(&self) -> RawDisplayHandle;
}

/// `winit`-free stand-in for a real OS window: fixed size, always open, no
/// event source to pump. `poll_events` never fires `on_resize` since nothing
/// ever changes the size -- callers that need a resize to actually happen
/// drive it through `set_size` directly (used by tests and the demo binary).
pub struct HeadlessWindow {
    width: u32,
    height: u32,
    open: bool,
    on_resize: Option<Box<dyn FnMut(u32, u32)>>,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            open: true,
            on_resize: None,
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if let Some(callback) = &mut self.on_resize {
            callback(width, height);
        }
    }

    pub fn close(&mut self) {
        self.open = false;
    }
}

impl Window for HeadlessWindow {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn on_resize(&mut self, callback: Box<dyn FnMut(u32, u32)>) {
        self.on_resize = Some(callback);
    }

    fn poll_events(&mut self) {}

    fn raw_window_handle(&self) -> RawWindowHandle {
        // No real surface backs this window; a `Window` handle is never
        // dereferenced by the core RHI (swap-chain surface creation is the
        // windowing shell's job, out of scope here), only threaded through as
        // an opaque handle.
        RawWindowHandle::Web(raw_window_handle::WebWindowHandle::new(1))
    }

    fn raw_display_handle(&self) -> RawDisplayHandle {
        RawDisplayHandle::Web(raw_window_handle::WebDisplayHandle::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_callback_fires_on_set_size() {
        let mut window = HeadlessWindow::new(800, 600);
        let seen = std::rc::Rc::new(std::cell::RefCell::new((0u32, 0u32)));
        let seen_clone = seen.clone();
        window.on_resize(Box::new(move |w, h| *seen_clone.borrow_mut() = (w, h)));
        window.set_size(1024, 768);
        assert_eq!(*seen.borrow(), (1024, 768));
        assert_eq!(window.size(), (1024, 768));
    }

    #[test]
    fn closes_when_asked() {
        let mut window = HeadlessWindow::new(640, 480);
        assert!(window.is_open());
        window.close();
        assert!(!window.is_open());
    }
}
