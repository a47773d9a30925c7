//! Thin application shell. Everything the windowing collaborator is required
//! to provide -- size, open/closed state, a resize callback, an event pump,
//! and the native handle needed to create a swap chain -- is captured in
//! `Window`; no other OS service crosses this boundary. `HeadlessWindow` is
//! the `winit`-free stub this crate ships so the demo binary (and anything
//! testing against this crate) doesn't need a real OS window.

pub mod error;
pub mod screenshot;
pub mod window;

pub use error::{AppError, AppResult};
pub use screenshot::write_screenshot;
pub use window::{HeadlessWindow, Window};
