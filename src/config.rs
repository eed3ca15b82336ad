//! Session configuration.
//!
//! Every policy constant (clamps, thresholds, smoothing) lives here with its
//! shipped default. [`ArConfig::from_env`] layers `ARSTICKER_*` environment
//! overrides on top of the defaults.

use crate::chroma::ChromaKeyParams;
use crate::overlay::MediaSource;
use crate::types::TrackingMode;
use std::time::Duration;

/// Top-level session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArConfig {
    /// Mode the session starts in.
    pub initial_mode: TrackingMode,
    /// Vertical field of view of the render camera, degrees.
    pub fov_deg: f64,
    pub pose: PoseConfig,
    pub gesture: GestureConfig,
    pub vo: VoConfig,
    pub overlay: OverlayConfig,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            initial_mode: TrackingMode::Sensor,
            fov_deg: 70.0,
            pose: PoseConfig::default(),
            gesture: GestureConfig::default(),
            vo: VoConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseConfig {
    /// Interpolation factor toward each smoothed VO pose, (0, 1].
    pub smoothing_factor: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.2,
        }
    }
}

/// Inclusive scale clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl ScaleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `scale` into the range. Inverted bounds are swapped and NaN
    /// bounds ignored, so a bad range never panics.
    pub fn clamp(&self, scale: f64) -> f64 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        scale.max(lo).min(hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Assumed overlay distance from the camera used for drag sensitivity.
    pub overlay_depth: f64,
    /// Max displacement per axis, in pixels, for a pointer sequence to count as a tap.
    pub tap_slop_px: f64,
    /// Max gap between two taps forming a double-tap.
    pub double_tap_window: Duration,
    /// Pinch clamp.
    pub touch_scale: ScaleRange,
    /// Mouse wheel clamp. Wheel steps are coarser than pinch ratios.
    pub wheel_scale: ScaleRange,
    /// Multiplier per wheel notch scrolling up.
    pub wheel_zoom_in: f64,
    /// Multiplier per wheel notch scrolling down.
    pub wheel_zoom_out: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            overlay_depth: 1.5,
            tap_slop_px: 10.0,
            double_tap_window: Duration::from_millis(300),
            touch_scale: ScaleRange::new(0.3, 20.0),
            wheel_scale: ScaleRange::new(0.3, 5.0),
            wheel_zoom_in: 1.1,
            wheel_zoom_out: 0.9,
        }
    }
}

/// Where visual odometry frames are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoExecution {
    /// On the tick, result applies to the same tick.
    #[default]
    Inline,
    /// On a worker thread, result applies one tick late.
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoConfig {
    /// FAST corner detection threshold handed to the engine.
    pub fast_threshold: u32,
    /// Max features tracked per frame.
    pub max_features: u32,
    /// Frame downscale factor before VO processing.
    pub downscale: f64,
    pub execution: VoExecution,
}

impl Default for VoConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_features: 500,
            downscale: 0.5,
            execution: VoExecution::Inline,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Plane height in local units. Width follows the media aspect.
    pub height: f64,
    /// Media placed when no source is given and none was used yet.
    pub default_media: MediaSource,
    pub chroma: ChromaKeyParams,
    /// Delay before the single autoplay retry.
    pub autoplay_retry_delay: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            height: 1.0,
            default_media: MediaSource::new("sticker.mp4"),
            chroma: ChromaKeyParams::default(),
            autoplay_retry_delay: Duration::from_millis(1000),
        }
    }
}

impl ArConfig {
    /// Defaults with `ARSTICKER_*` environment overrides applied.
    ///
    /// Malformed values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let mode = read_env_string("ARSTICKER_TRACKING_MODE", config.initial_mode.as_str());
        match mode.parse::<TrackingMode>() {
            Ok(m) => config.initial_mode = m,
            Err(e) => log::warn!("Ignoring ARSTICKER_TRACKING_MODE: {}", e),
        }

        let smoothing = read_env_f64("ARSTICKER_SMOOTHING", config.pose.smoothing_factor);
        if smoothing > 0.0 && smoothing <= 1.0 {
            config.pose.smoothing_factor = smoothing;
        } else {
            log::warn!("Ignoring ARSTICKER_SMOOTHING={} (expected 0 < f <= 1)", smoothing);
        }

        if read_env_bool("ARSTICKER_VO_WORKER", false) {
            config.vo.execution = VoExecution::Worker;
        }
        config.vo.fast_threshold =
            read_env_u32("ARSTICKER_VO_FAST_THRESHOLD", config.vo.fast_threshold);
        config.vo.max_features = read_env_u32("ARSTICKER_VO_MAX_FEATURES", config.vo.max_features);

        if let Ok(media) = std::env::var("ARSTICKER_MEDIA") {
            let media = media.trim();
            if !media.is_empty() {
                config.overlay.default_media = MediaSource::new(media);
            }
        }

        config
    }
}

fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| {
            let v = v.trim().to_ascii_lowercase();
            match v.as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        })
        .unwrap_or(default)
}

fn read_env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn read_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
