//! # arsticker - chroma-keyed video sticker AR sessions
//!
//! Places a green-screen video on a camera-parented plane over the live
//! camera feed and keeps the virtual camera aligned with the device.
//! Provides:
//! - Camera pose from device orientation, visual odometry, or both (hybrid)
//! - Optional VO engine, initialized lazily and run inline or on a worker thread
//! - Drag / pinch / wheel / double-tap gestures on the overlay
//! - Chroma-key shader contract with a CPU reference implementation
//! - C FFI for hosts that own their render loop
//!
//! Camera, renderer, media decoding and the VO engine are host collaborators
//! behind traits; the session only orchestrates them.
//!
//! ## Quick Start
//! ```no_run
//! use arsticker::{ArApp, ArConfig, MediaFactory, MediaSource, OverlayMedia, TextureHandle};
//! use arsticker::{OrientationEvent, TrackingMode};
//! use std::time::Instant;
//!
//! struct Video;
//! impl OverlayMedia for Video {
//!     fn texture(&self) -> TextureHandle { TextureHandle(1) }
//!     fn natural_size(&self) -> Option<(u32, u32)> { Some((1080, 1920)) }
//!     fn play(&mut self) -> arsticker::Result<()> { Ok(()) }
//!     fn pause(&mut self) {}
//!     fn refresh_texture(&mut self) {}
//!     fn release(&mut self) {}
//! }
//!
//! struct Videos;
//! impl MediaFactory for Videos {
//!     fn load(&mut self, _: &MediaSource) -> arsticker::Result<Box<dyn OverlayMedia>> {
//!         Ok(Box::new(Video))
//!     }
//! }
//!
//! let mut app = ArApp::builder(ArConfig::from_env(), Box::new(Videos)).start(Instant::now());
//! app.on_orientation(OrientationEvent::new(0.0, 90.0, 0.0));
//! app.set_tracking_mode(TrackingMode::Sensor).unwrap();
//! while app.tick(Instant::now()) {
//!     println!("camera: {:?}", app.camera_pose().position);
//!     # break;
//! }
//! app.destroy();
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod orientation;
pub mod sensor;
pub mod camera_pose;
pub mod vo;
pub mod vo_worker;
pub mod frame;
pub mod tracking;
pub mod gesture;
pub mod chroma;
pub mod overlay;
pub mod notify;
pub mod render;
pub mod app;
pub mod ffi;

#[cfg(test)]
mod testing;

pub use app::{ArApp, ArAppBuilder};
pub use camera_pose::CameraPoseManager;
pub use chroma::ChromaKeyParams;
pub use config::ArConfig;
pub use error::ArError;
pub use frame::{CameraStream, SlamFrameProcessor};
pub use gesture::{GestureController, GestureEvent};
pub use notify::Notifier;
pub use overlay::{MediaFactory, MediaSource, OverlayCompositor, OverlayMedia, TextureHandle};
pub use render::{FrameDescription, Renderer};
pub use sensor::SensorPoseSource;
pub use tracking::TrackingModeController;
pub use types::*;
pub use vo::{VoEngine, VoProvider};

/// Result type alias for arsticker operations.
pub type Result<T> = std::result::Result<T, ArError>;
