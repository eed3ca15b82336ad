use nalgebra::{UnitQuaternion, Vector3};
use std::fmt;
use std::str::FromStr;

/// Raw device-orientation event as delivered by the host.
///
/// Any angle may be missing on platforms without the corresponding sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationEvent {
    /// Azimuth around the device Z axis, degrees [0, 360).
    pub alpha: Option<f64>,
    /// Front-to-back tilt around the device X axis, degrees [-180, 180).
    pub beta: Option<f64>,
    /// Left-to-right tilt around the device Y axis, degrees [-90, 90).
    pub gamma: Option<f64>,
}

impl OrientationEvent {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    /// Validate into a sample. A missing azimuth makes the event unusable.
    pub fn sample(&self) -> Option<OrientationSample> {
        let alpha = self.alpha.filter(|a| a.is_finite())?;
        Some(OrientationSample {
            alpha,
            beta: self.beta.filter(|b| b.is_finite()).unwrap_or(0.0),
            gamma: self.gamma.filter(|g| g.is_finite()).unwrap_or(0.0),
        })
    }
}

/// Validated device orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationSample {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Device-motion acceleration in m/s², gravity excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One visual odometry result for a processed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewEstimate {
    /// 4x4 world-to-camera view matrix, column-major (WebGL layout).
    pub view_matrix: [f64; 16],
    /// Whether the engine is confidently tracking on this frame.
    pub tracking: bool,
    /// Number of features matched on this frame.
    pub feature_count: u32,
}

/// Authoritative pose of the render camera in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

/// Which pose sources feed the camera each tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TrackingMode {
    /// Device-orientation sensors only.
    #[default]
    Sensor = 0,
    /// Visual odometry only.
    Slam = 1,
    /// Visual odometry when tracking, sensors otherwise.
    Hybrid = 2,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Slam => "slam",
            Self::Hybrid => "hybrid",
        }
    }

    /// Modes that need a visual odometry engine.
    pub fn uses_vo(&self) -> bool {
        matches!(self, Self::Slam | Self::Hybrid)
    }

    /// Modes that consult device orientation.
    pub fn uses_sensor(&self) -> bool {
        matches!(self, Self::Sensor | Self::Hybrid)
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackingMode {
    type Err = crate::ArError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sensor" => Ok(Self::Sensor),
            "slam" => Ok(Self::Slam),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(crate::ArError::InvalidArgument(format!(
                "unknown tracking mode '{}' (expected sensor|slam|hybrid)",
                other
            ))),
        }
    }
}

/// A pointer position in CSS/screen pixels, Y growing downward.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Pixel dimensions of a camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// One RGBA8 camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn size(&self) -> FrameSize {
        FrameSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Overlay placement in camera-local space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayTransform {
    pub x: f64,
    pub y: f64,
    /// Fixed depth in front of the camera (negative Z looks forward).
    pub z: f64,
    pub scale: f64,
}

impl OverlayTransform {
    /// Centered in view at `depth` units, unit scale.
    pub fn at_depth(depth: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: -depth,
            scale: 1.0,
        }
    }
}

/// Snapshot for status overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugInfo {
    pub position: Vector3<f64>,
    /// Whether the last applied visual odometry estimate was tracking.
    pub tracking: bool,
    pub mode: TrackingMode,
    pub feature_count: u32,
    pub acceleration: Option<Acceleration>,
}

bitflags::bitflags! {
    /// Resources a session still owns and must release on teardown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Resources: u32 {
        const TICK_LOOP     = 1 << 0;
        const OVERLAY_MEDIA = 1 << 1;
        const CAMERA_STREAM = 1 << 2;
        const RENDERER      = 1 << 3;
        const VO_ENGINE     = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Optional features a visual odometry engine reports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(C)]
    pub struct VoCapabilities: u32 {
        /// Engine derives intrinsics from frame dimensions.
        const AUTO_CALIBRATION = 1 << 0;
        /// Engine can drop its map and restart tracking in place.
        const RESET            = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_event_requires_alpha() {
        let event = OrientationEvent {
            alpha: None,
            beta: Some(10.0),
            gamma: Some(5.0),
        };
        assert!(event.sample().is_none());

        let partial = OrientationEvent {
            alpha: Some(30.0),
            beta: None,
            gamma: Some(f64::NAN),
        };
        let sample = partial.sample().unwrap();
        assert_eq!(sample.alpha, 30.0);
        assert_eq!(sample.beta, 0.0);
        assert_eq!(sample.gamma, 0.0);
    }

    #[test]
    fn test_tracking_mode_parse() {
        assert_eq!("SLAM".parse::<TrackingMode>().unwrap(), TrackingMode::Slam);
        assert_eq!(" hybrid ".parse::<TrackingMode>().unwrap(), TrackingMode::Hybrid);
        assert!("gps".parse::<TrackingMode>().is_err());
        assert_eq!(TrackingMode::default(), TrackingMode::Sensor);
    }

    #[test]
    fn test_mode_source_selection() {
        assert!(TrackingMode::Sensor.uses_sensor() && !TrackingMode::Sensor.uses_vo());
        assert!(!TrackingMode::Slam.uses_sensor() && TrackingMode::Slam.uses_vo());
        assert!(TrackingMode::Hybrid.uses_sensor() && TrackingMode::Hybrid.uses_vo());
    }
}
