//! Camera frames and the per-tick visual odometry pass.

use crate::camera_pose::CameraPoseManager;
use crate::types::{Frame, FrameSize};
use crate::vo::VoHandle;
use crate::Result;
use nalgebra::Vector3;
use std::fmt;

/// Live camera feed supplied by the host.
pub trait CameraStream {
    /// Dimensions of the current video, once metadata has loaded.
    fn frame_size(&self) -> Option<FrameSize>;

    /// Grab the current frame as RGBA8.
    fn read_frame(&mut self) -> Option<Frame>;

    /// Replace the stream with the next available camera.
    fn switch_camera(&mut self) -> Result<()>;

    /// Stop every track of the stream.
    fn stop(&mut self);
}

/// Box-filter an RGBA8 frame down by `factor`.
///
/// Factors at or above 1.0 return the frame unchanged. Returns `None` if the
/// pixel buffer does not match the frame dimensions.
pub fn downscale(frame: &Frame, factor: f64) -> Option<Frame> {
    let (w, h) = (frame.width as usize, frame.height as usize);
    if w == 0 || h == 0 || frame.pixels.len() != w * h * 4 || !factor.is_finite() || factor <= 0.0 {
        return None;
    }
    if factor >= 1.0 {
        return Some(frame.clone());
    }

    let out_w = ((w as f64 * factor) as usize).max(1);
    let out_h = ((h as f64 * factor) as usize).max(1);
    let mut pixels = vec![0u8; out_w * out_h * 4];

    for oy in 0..out_h {
        let y0 = oy * h / out_h;
        let y1 = ((oy + 1) * h / out_h).max(y0 + 1);
        for ox in 0..out_w {
            let x0 = ox * w / out_w;
            let x1 = ((ox + 1) * w / out_w).max(x0 + 1);

            let mut sum = [0u32; 4];
            for y in y0..y1 {
                let row = &frame.pixels[(y * w + x0) * 4..(y * w + x1) * 4];
                for px in row.chunks_exact(4) {
                    for c in 0..4 {
                        sum[c] += px[c] as u32;
                    }
                }
            }

            let count = ((y1 - y0) * (x1 - x0)) as u32;
            let out = (oy * out_w + ox) * 4;
            for c in 0..4 {
                pixels[out + c] = ((sum[c] + count / 2) / count) as u8;
            }
        }
    }

    Some(Frame {
        width: out_w as u32,
        height: out_h as u32,
        pixels,
    })
}

/// Status surfaced after a tracking VO frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlamStatus {
    pub feature_count: u32,
    pub position: Vector3<f64>,
}

impl fmt::Display for SlamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SLAM: {} features | pos ({:.2}, {:.2}, {:.2})",
            self.feature_count, self.position.x, self.position.y, self.position.z
        )
    }
}

/// Per-tick visual odometry pass: downscale, track, apply.
#[derive(Debug, Clone)]
pub struct SlamFrameProcessor {
    downscale: f64,
    /// Processed size the engine intrinsics were configured for.
    configured_for: Option<FrameSize>,
}

impl SlamFrameProcessor {
    pub fn new(downscale: f64) -> Self {
        Self {
            downscale,
            configured_for: None,
        }
    }

    /// Force intrinsics auto-configuration on the next processed frame.
    pub fn invalidate_configuration(&mut self) {
        self.configured_for = None;
    }

    /// Run one frame through the engine.
    ///
    /// Skips quietly without an engine, a camera or known frame dimensions.
    /// A tracking estimate is applied with smoothing; a lost one leaves the
    /// pose untouched. Returns the status when tracking.
    pub fn process(
        &mut self,
        vo: Option<&mut VoHandle>,
        camera: Option<&mut (dyn CameraStream + 'static)>,
        poses: &mut CameraPoseManager,
    ) -> Option<SlamStatus> {
        let vo = vo?;
        let camera = camera?;
        camera.frame_size()?;

        let full = camera.read_frame()?;
        let Some(frame) = downscale(&full, self.downscale) else {
            log::warn!(
                "Skipping malformed camera frame {}x{} ({} bytes)",
                full.width,
                full.height,
                full.pixels.len()
            );
            return None;
        };

        let size = frame.size();
        if self.configured_for != Some(size) {
            log::info!("Configuring VO intrinsics for {}x{}", size.width, size.height);
            vo.auto_configure_camera(size.width, size.height);
            self.configured_for = Some(size);
        }

        let estimate = vo.process(frame)?;
        if !poses.apply_view_estimate(&estimate, true) {
            log::trace!("VO not tracking ({} features)", estimate.feature_count);
            return None;
        }

        Some(SlamStatus {
            feature_count: estimate.feature_count,
            position: poses.pose().position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PoseConfig, VoExecution};
    use crate::testing::{FakeCamera, FakeVo, VoCall};
    use crate::types::TrackingMode;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Frame {
        Frame {
            width,
            height,
            pixels: rgba.repeat((width * height) as usize),
        }
    }

    #[test]
    fn test_downscale_halves_dimensions() {
        let out = downscale(&solid(640, 480, [10, 20, 30, 255]), 0.5).unwrap();
        assert_eq!((out.width, out.height), (320, 240));
        assert_eq!(out.pixels.len(), 320 * 240 * 4);
        assert_eq!(&out.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_downscale_averages_box() {
        // 2x1: black and white average to mid grey.
        let frame = Frame {
            width: 2,
            height: 1,
            pixels: vec![0, 0, 0, 255, 255, 255, 255, 255],
        };
        let out = downscale(&frame, 0.5).unwrap();
        assert_eq!((out.width, out.height), (1, 1));
        assert_eq!(out.pixels, vec![128, 128, 128, 255]);
    }

    #[test]
    fn test_downscale_rejects_short_buffer() {
        let frame = Frame {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        assert!(downscale(&frame, 0.5).is_none());
    }

    #[test]
    fn test_skips_without_engine_or_dimensions() {
        let mut processor = SlamFrameProcessor::new(0.5);
        let mut poses = CameraPoseManager::new(&PoseConfig::default());
        let mut camera = FakeCamera::new(64, 48);

        assert!(processor.process(None, Some(&mut camera), &mut poses).is_none());

        let fake = FakeVo::tracking();
        let mut vo = VoHandle::new(Box::new(fake.clone()), VoExecution::Inline).unwrap();
        let mut no_meta = FakeCamera::without_metadata();
        assert!(processor.process(Some(&mut vo), Some(&mut no_meta), &mut poses).is_none());
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_tracking_frame_updates_pose_and_status() {
        let mut processor = SlamFrameProcessor::new(0.5);
        let mut poses = CameraPoseManager::new(&PoseConfig::default());
        poses.begin_tick(TrackingMode::Slam);
        let mut camera = FakeCamera::new(64, 48);
        let fake = FakeVo::tracking_at(0.5, 0.0, 0.0);
        let mut vo = VoHandle::new(Box::new(fake.clone()), VoExecution::Inline).unwrap();

        let status = processor
            .process(Some(&mut vo), Some(&mut camera), &mut poses)
            .unwrap();
        assert_eq!(status.feature_count, 42);
        assert!((status.position.x - 0.5).abs() < 1e-9);
        assert!(status.to_string().starts_with("SLAM: 42 features"));

        // Engine sees half-resolution frames and is configured once.
        poses.begin_tick(TrackingMode::Slam);
        processor.process(Some(&mut vo), Some(&mut camera), &mut poses);
        assert_eq!(
            fake.calls(),
            vec![VoCall::Configure(32, 24), VoCall::Process(32, 24), VoCall::Process(32, 24)]
        );
    }

    #[test]
    fn test_lost_frame_leaves_pose() {
        let mut processor = SlamFrameProcessor::new(0.5);
        let mut poses = CameraPoseManager::new(&PoseConfig::default());
        poses.begin_tick(TrackingMode::Slam);
        let mut camera = FakeCamera::new(64, 48);
        let mut vo = VoHandle::new(Box::new(FakeVo::lost()), VoExecution::Inline).unwrap();

        assert!(processor.process(Some(&mut vo), Some(&mut camera), &mut poses).is_none());
        assert!(poses.pose().position.norm() < 1e-12);
        assert!(poses.writer().is_none());
    }

    #[test]
    fn test_reconfigures_after_invalidation() {
        let mut processor = SlamFrameProcessor::new(0.5);
        let mut poses = CameraPoseManager::new(&PoseConfig::default());
        let mut camera = FakeCamera::new(64, 48);
        let fake = FakeVo::lost();
        let mut vo = VoHandle::new(Box::new(fake.clone()), VoExecution::Inline).unwrap();

        processor.process(Some(&mut vo), Some(&mut camera), &mut poses);
        processor.invalidate_configuration();
        processor.process(Some(&mut vo), Some(&mut camera), &mut poses);

        let configures = fake
            .calls()
            .iter()
            .filter(|c| matches!(c, VoCall::Configure(..)))
            .count();
        assert_eq!(configures, 2);
    }
}
