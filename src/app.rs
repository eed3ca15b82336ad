//! The session context: one per AR view.
//!
//! [`ArApp`] owns every subsystem and is driven from outside: the host calls
//! [`tick`](ArApp::tick) once per display refresh, forwards pointer and
//! sensor events as they arrive, and invokes the external operations (reset,
//! mode switch, media change, camera switch, teardown) as methods.

use crate::camera_pose::CameraPoseManager;
use crate::config::ArConfig;
use crate::frame::{CameraStream, SlamFrameProcessor};
use crate::gesture::{GestureController, GestureEvent};
use crate::notify::{LogNotifier, Notifier};
use crate::overlay::{MediaFactory, MediaSource, OverlayCompositor};
use crate::render::{FrameDescription, Renderer};
use crate::sensor::SensorPoseSource;
use crate::tracking::{TrackingModeController, VoStatus};
use crate::types::{
    Acceleration, CameraPose, DebugInfo, OrientationEvent, OverlayTransform, Resources,
    ScreenPoint, TrackingMode,
};
use crate::vo::{NoVo, VoProvider};
use crate::{ArError, Result};
use std::time::Instant;

/// Assembles an [`ArApp`]. Camera and renderer are optional: a missing one
/// is logged and its subsystem skipped.
pub struct ArAppBuilder {
    config: ArConfig,
    media: Box<dyn MediaFactory>,
    camera: Option<Box<dyn CameraStream>>,
    renderer: Option<Box<dyn Renderer>>,
    vo_provider: Box<dyn VoProvider>,
    notifier: Box<dyn Notifier>,
    sensors: SensorPoseSource,
    viewport: (u32, u32),
}

impl ArAppBuilder {
    pub fn new(config: ArConfig, media: Box<dyn MediaFactory>) -> Self {
        Self {
            config,
            media,
            camera: None,
            renderer: None,
            vo_provider: Box::new(NoVo),
            notifier: Box::new(LogNotifier),
            sensors: SensorPoseSource::new(),
            viewport: (1280, 720),
        }
    }

    pub fn camera(mut self, camera: Box<dyn CameraStream>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn vo_provider(mut self, provider: Box<dyn VoProvider>) -> Self {
        self.vo_provider = provider;
        self
    }

    pub fn notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Share a sensor source the host already feeds.
    pub fn sensors(mut self, sensors: SensorPoseSource) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width.max(1), height.max(1));
        self
    }

    /// Bring the session up, reporting progress to the notifier.
    pub fn start(self, now: Instant) -> ArApp {
        let config = self.config;
        let (width, height) = self.viewport;

        let mut app = ArApp {
            poses: CameraPoseManager::new(&config.pose),
            tracking: TrackingModeController::new(self.vo_provider, &config.vo),
            slam: SlamFrameProcessor::new(config.vo.downscale),
            gestures: GestureController::new(config.gesture, config.fov_deg, height as f64),
            overlay: OverlayCompositor::new(
                self.media,
                config.overlay.clone(),
                config.gesture.overlay_depth,
            ),
            sensors: self.sensors,
            camera: self.camera,
            renderer: self.renderer,
            notifier: self.notifier,
            viewport: self.viewport,
            owned: Resources::empty(),
            config,
        };

        app.notifier.advance(10, "Starting camera");
        if app.camera.is_some() {
            app.owned |= Resources::CAMERA_STREAM;
        } else {
            app.report(&ArError::MissingAnchor("camera"));
        }

        app.notifier.advance(40, "Preparing renderer");
        match app.renderer.as_mut() {
            Some(renderer) => {
                renderer.resize(width, height);
                app.owned |= Resources::RENDERER;
            }
            None => app.report(&ArError::MissingAnchor("renderer")),
        }

        app.notifier.advance(70, "Loading overlay");
        app.place_overlay(None, now);

        app.owned |= Resources::TICK_LOOP;
        let initial = app.config.initial_mode;
        if initial != TrackingMode::Sensor {
            let _ = app.set_tracking_mode(initial);
        }

        app.notifier.advance(100, "Ready");
        app.notifier.complete();
        app.notifier.show_hint();
        log::info!("Session started ({} tracking)", app.mode());
        app
    }
}

/// A running AR session.
pub struct ArApp {
    config: ArConfig,
    sensors: SensorPoseSource,
    poses: CameraPoseManager,
    tracking: TrackingModeController,
    slam: SlamFrameProcessor,
    gestures: GestureController,
    overlay: OverlayCompositor,
    camera: Option<Box<dyn CameraStream>>,
    renderer: Option<Box<dyn Renderer>>,
    notifier: Box<dyn Notifier>,
    viewport: (u32, u32),
    owned: Resources,
}

impl ArApp {
    pub fn builder(config: ArConfig, media: Box<dyn MediaFactory>) -> ArAppBuilder {
        ArAppBuilder::new(config, media)
    }

    fn report(&mut self, err: &ArError) {
        log::warn!("{}", err);
        self.notifier.status(&err.to_string());
    }

    pub fn mode(&self) -> TrackingMode {
        self.tracking.mode()
    }

    pub fn vo_status(&self) -> VoStatus {
        self.tracking.vo_status()
    }

    pub fn camera_pose(&self) -> &CameraPose {
        self.poses.pose()
    }

    pub fn overlay_transform(&self) -> Option<&OverlayTransform> {
        self.overlay.transform()
    }

    pub fn overlay(&self) -> &OverlayCompositor {
        &self.overlay
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    /// Resources still held; empty after [`destroy`](Self::destroy).
    pub fn resources(&self) -> Resources {
        self.owned
    }

    pub fn is_running(&self) -> bool {
        self.owned.contains(Resources::TICK_LOOP)
    }

    /// Handle for host sensor callbacks.
    pub fn sensors(&self) -> SensorPoseSource {
        self.sensors.clone()
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            acceleration: self.sensors.latest().acceleration,
            ..self.poses.debug_info()
        }
    }

    /// One animation frame. Returns `false` once the session is torn down.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_running() {
            return false;
        }

        match self.tracking.poll_vo() {
            Some(Ok(())) => {
                self.owned |= Resources::VO_ENGINE;
                self.notifier.status("SLAM ready");
            }
            Some(Err(e)) => {
                self.owned.remove(Resources::VO_ENGINE);
                self.notifier
                    .status(&format!("SLAM unavailable ({}), using sensors", e));
            }
            None => {}
        }

        let mode = self.tracking.mode();
        self.poses.begin_tick(mode);

        if mode.uses_vo() {
            let status = self.slam.process(
                self.tracking.vo_mut(),
                self.camera.as_deref_mut(),
                &mut self.poses,
            );
            if let Some(status) = status {
                self.notifier.status(&status.to_string());
            }
        }

        if mode.uses_sensor() {
            let reading = self.sensors.latest();
            if let Some(sample) = reading.orientation {
                self.poses
                    .apply_device_orientation(sample, reading.screen_orientation_deg);
            }
        }

        self.overlay.update(now);

        if let Some(renderer) = self.renderer.as_mut() {
            let (width, height) = self.viewport;
            renderer.render(&FrameDescription {
                camera: *self.poses.pose(),
                fov_deg: self.config.fov_deg,
                aspect: width as f64 / height as f64,
                overlay: self.overlay.drawable(),
            });
        }
        true
    }

    pub fn on_orientation(&mut self, event: OrientationEvent) {
        self.sensors.push_orientation(event);
    }

    pub fn on_motion(&mut self, acceleration: Acceleration) {
        self.sensors.push_acceleration(acceleration);
    }

    pub fn on_screen_orientation(&mut self, degrees: f64) {
        self.sensors.set_screen_orientation(degrees);
    }

    pub fn on_pointer_down(&mut self, pointers: &[ScreenPoint]) -> GestureEvent {
        self.gestures.on_pointer_down(pointers, self.overlay.transform())
    }

    pub fn on_pointer_move(&mut self, pointers: &[ScreenPoint]) -> GestureEvent {
        self.gestures
            .on_pointer_move(pointers, self.overlay.transform_mut())
    }

    /// A pointer lifted. A double tap places the overlay again.
    pub fn on_pointer_up(&mut self, remaining: &[ScreenPoint], now: Instant) -> GestureEvent {
        let event = self
            .gestures
            .on_pointer_up(remaining, self.overlay.transform(), now);
        if event == GestureEvent::DoubleTap && self.is_running() {
            self.place_overlay(None, now);
        }
        event
    }

    pub fn on_wheel(&mut self, delta_y: f64) -> GestureEvent {
        self.gestures.on_wheel(delta_y, self.overlay.transform_mut())
    }

    /// Viewport resized. Affects projection and drag sensitivity only.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        self.gestures.resize(self.viewport.1 as f64);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(self.viewport.0, self.viewport.1);
        }
    }

    /// Re-center tracking: the next sample defines forward.
    pub fn reset_pose(&mut self) {
        if !self.is_running() {
            return;
        }
        self.poses.reset();
        self.tracking.reset_vo();
        self.notifier.status("Pose reset");
    }

    /// Switch tracking mode. Failures fall back to sensor tracking.
    pub fn set_tracking_mode(&mut self, mode: TrackingMode) -> Result<()> {
        if !self.is_running() {
            return Err(ArError::InvalidArgument("session destroyed".into()));
        }
        match self.tracking.set_mode(mode) {
            Ok(()) => {
                if self.tracking.vo_status() != VoStatus::Absent {
                    self.owned |= Resources::VO_ENGINE;
                }
                self.notifier.status(&format!("Tracking: {}", self.mode()));
                Ok(())
            }
            Err(e) => {
                self.notifier
                    .status(&format!("SLAM unavailable ({}), using sensors", e));
                Err(e)
            }
        }
    }

    fn place_overlay(&mut self, source: Option<MediaSource>, now: Instant) {
        match self.overlay.place(source, now) {
            Ok(()) => self.owned |= Resources::OVERLAY_MEDIA,
            Err(e) => {
                self.owned.remove(Resources::OVERLAY_MEDIA);
                self.report(&e);
            }
        }
    }

    /// Replace the overlay with new media.
    pub fn change_media(&mut self, source: MediaSource, now: Instant) -> bool {
        if !self.is_running() {
            return false;
        }
        self.place_overlay(Some(source), now);
        self.overlay.is_placed()
    }

    /// Move to the next camera. VO restarts on the new stream.
    pub fn switch_camera(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(ArError::CameraUnavailable("session destroyed".into()));
        }
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| ArError::CameraUnavailable("no camera stream".into()))?;
        if let Err(e) = camera.switch_camera() {
            self.report(&e);
            return Err(e);
        }
        self.slam.invalidate_configuration();
        self.tracking.reset_vo();
        log::info!("Camera switched");
        Ok(())
    }

    /// Tear the session down: tick loop, overlay, camera, renderer, VO.
    ///
    /// Safe to call repeatedly; each resource is released once.
    pub fn destroy(&mut self) {
        if self.owned.is_empty() {
            return;
        }

        self.owned.remove(Resources::TICK_LOOP);

        if self.owned.contains(Resources::OVERLAY_MEDIA) {
            self.overlay.dispose();
            self.owned.remove(Resources::OVERLAY_MEDIA);
        }

        if self.owned.contains(Resources::CAMERA_STREAM) {
            if let Some(camera) = self.camera.as_mut() {
                camera.stop();
            }
            self.owned.remove(Resources::CAMERA_STREAM);
        }

        if self.owned.contains(Resources::RENDERER) {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.release();
            }
            self.owned.remove(Resources::RENDERER);
        }

        if self.owned.contains(Resources::VO_ENGINE) {
            self.tracking.release();
            self.owned.remove(Resources::VO_ENGINE);
        }

        log::info!("Session destroyed");
    }
}

impl Drop for ArApp {
    fn drop(&mut self) {
        self.destroy();
    }
}
