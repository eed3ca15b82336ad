use crate::config::PoseConfig;
use crate::orientation;
use crate::types::{CameraPose, DebugInfo, OrientationSample, TrackingMode, ViewEstimate};

/// Which pose source wrote the camera during the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseWriter {
    Sensor,
    VisualOdometry,
}

/// Owner of the authoritative camera pose.
///
/// Each tick starts with [`begin_tick`](Self::begin_tick); after that at most
/// one source may write the pose. In hybrid mode a tracking VO estimate
/// demotes the sensor for the rest of the tick.
#[derive(Debug, Clone)]
pub struct CameraPoseManager {
    pose: CameraPose,
    reference: Option<OrientationSample>,
    smoothing_factor: f64,
    /// Set once a VO pose has been applied since the last reset.
    smoothing_primed: bool,
    mode: TrackingMode,
    vo_tracking_this_tick: bool,
    last_vo_tracking: bool,
    feature_count: u32,
    writer: Option<PoseWriter>,
}

impl CameraPoseManager {
    pub fn new(config: &PoseConfig) -> Self {
        Self {
            pose: CameraPose::default(),
            reference: None,
            smoothing_factor: config.smoothing_factor.clamp(f64::EPSILON, 1.0),
            smoothing_primed: false,
            mode: TrackingMode::default(),
            vo_tracking_this_tick: false,
            last_vo_tracking: false,
            feature_count: 0,
            writer: None,
        }
    }

    /// Open a new tick under `mode`.
    pub fn begin_tick(&mut self, mode: TrackingMode) {
        self.mode = mode;
        self.vo_tracking_this_tick = false;
        self.writer = None;
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn reference(&self) -> Option<OrientationSample> {
        self.reference
    }

    /// Writer of the current tick, if any.
    pub fn writer(&self) -> Option<PoseWriter> {
        self.writer
    }

    fn claim(&mut self, writer: PoseWriter) -> bool {
        match self.writer {
            None => {
                self.writer = Some(writer);
                true
            }
            Some(existing) => {
                log::trace!("{:?} write ignored, pose already written by {:?}", writer, existing);
                false
            }
        }
    }

    /// Apply a device-orientation sample relative to the reference.
    ///
    /// The first sample after construction or [`reset`](Self::reset) becomes
    /// the reference. Returns whether the camera orientation was written.
    pub fn apply_device_orientation(
        &mut self,
        sample: OrientationSample,
        screen_orientation_deg: f64,
    ) -> bool {
        if self.mode == TrackingMode::Hybrid && self.vo_tracking_this_tick {
            return false;
        }
        if !self.claim(PoseWriter::Sensor) {
            return false;
        }

        let reference = *self.reference.get_or_insert_with(|| {
            log::debug!("Reference orientation captured: {:?}", sample);
            sample
        });

        self.pose.orientation = orientation::device_orientation_to_quaternion(
            sample.alpha - reference.alpha,
            sample.beta,
            sample.gamma,
            screen_orientation_deg,
        );
        true
    }

    /// Apply a VO view matrix, optionally blending toward it.
    ///
    /// Returns whether the camera pose was written. Non-invertible matrices
    /// are dropped.
    pub fn apply_view_matrix(&mut self, view_matrix: &[f64; 16], smoothed: bool) -> bool {
        let Some(target) = orientation::pose_from_view_matrix(view_matrix) else {
            log::warn!("Dropping degenerate VO view matrix");
            return false;
        };
        if !self.claim(PoseWriter::VisualOdometry) {
            return false;
        }

        if smoothed && self.smoothing_primed {
            let t = self.smoothing_factor;
            self.pose.position = self.pose.position.lerp(&target.position, t);
            self.pose.orientation = self
                .pose
                .orientation
                .try_slerp(&target.orientation, t, 1e-9)
                .unwrap_or(target.orientation);
        } else {
            self.pose = target;
        }
        self.smoothing_primed = true;
        true
    }

    /// Record one VO result and apply it when it is tracking.
    pub fn apply_view_estimate(&mut self, estimate: &ViewEstimate, smoothed: bool) -> bool {
        self.last_vo_tracking = estimate.tracking;
        self.feature_count = estimate.feature_count;
        if !estimate.tracking {
            return false;
        }
        let written = self.apply_view_matrix(&estimate.view_matrix, smoothed);
        if written {
            self.vo_tracking_this_tick = true;
        }
        written
    }

    /// Forget the reference orientation and smoothing history.
    pub fn reset(&mut self) {
        self.reference = None;
        self.smoothing_primed = false;
        self.last_vo_tracking = false;
        log::info!("Camera pose reference cleared");
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            position: self.pose.position,
            tracking: self.last_vo_tracking,
            mode: self.mode,
            feature_count: self.feature_count,
            acceleration: None,
        }
    }
}
