pub mod camera;
pub mod scene;

pub use camera::Camera;
pub use scene::{DebugLineBuffer, DirectionalLight, DrawItem, MaterialIndices, Scene};
