use crate::overlay::OverlayDrawable;
use crate::types::CameraPose;

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDescription {
    pub camera: CameraPose,
    /// Vertical field of view, degrees.
    pub fov_deg: f64,
    /// Viewport width / height.
    pub aspect: f64,
    /// The overlay, parented to the camera.
    pub overlay: Option<OverlayDrawable>,
}

/// Scene renderer supplied by the host.
pub trait Renderer {
    fn render(&mut self, frame: &FrameDescription);

    /// Viewport changed, in pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Free GPU resources.
    fn release(&mut self);
}
