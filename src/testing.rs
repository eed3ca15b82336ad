//! In-memory collaborators for unit tests.

use crate::frame::CameraStream;
use crate::notify::Notifier;
use crate::orientation::view_matrix_from_pose;
use crate::overlay::{MediaFactory, MediaSource, OverlayMedia, TextureHandle};
use crate::render::{FrameDescription, Renderer};
use crate::types::{CameraPose, Frame, FrameSize, ViewEstimate, VoCapabilities};
use crate::vo::{VoEngine, VoInitConfig, VoProvider};
use crate::{ArError, Result};
use nalgebra::{UnitQuaternion, Vector3};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Cross-collaborator event log, for ordering assertions.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoCall {
    Init,
    Configure(u32, u32),
    Process(u32, u32),
    Reset,
    Destroy,
}

pub fn estimate_at(x: f64, y: f64, z: f64, tracking: bool) -> ViewEstimate {
    let pose = CameraPose {
        position: Vector3::new(x, y, z),
        orientation: UnitQuaternion::identity(),
    };
    ViewEstimate {
        view_matrix: view_matrix_from_pose(&pose),
        tracking,
        feature_count: 42,
    }
}

#[derive(Clone)]
pub struct FakeVo {
    calls: Arc<Mutex<Vec<VoCall>>>,
    estimate: Arc<Mutex<Option<ViewEstimate>>>,
    fail_init: bool,
    capabilities: VoCapabilities,
    journal: Option<Journal>,
}

impl FakeVo {
    fn with_estimate(estimate: Option<ViewEstimate>) -> Self {
        Self {
            calls: Arc::default(),
            estimate: Arc::new(Mutex::new(estimate)),
            fail_init: false,
            capabilities: VoCapabilities::all(),
            journal: None,
        }
    }

    pub fn tracking() -> Self {
        Self::tracking_at(0.0, 0.0, 0.0)
    }

    pub fn tracking_at(x: f64, y: f64, z: f64) -> Self {
        Self::with_estimate(Some(estimate_at(x, y, z, true)))
    }

    pub fn lost() -> Self {
        Self::with_estimate(Some(estimate_at(0.0, 0.0, 0.0, false)))
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn with_capabilities(mut self, capabilities: VoCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// Change what subsequent frames return.
    pub fn set_estimate(&self, estimate: Option<ViewEstimate>) {
        *self.estimate.lock().unwrap() = estimate;
    }

    pub fn calls(&self) -> Vec<VoCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: VoCall) {
        if let Some(journal) = &self.journal {
            journal.push(format!("vo.{:?}", call).to_lowercase());
        }
        self.calls.lock().unwrap().push(call);
    }
}

impl VoEngine for FakeVo {
    fn init(&mut self, _config: &VoInitConfig) -> Result<()> {
        self.record(VoCall::Init);
        if self.fail_init {
            return Err(ArError::VoInit("wasm module failed to load".into()));
        }
        Ok(())
    }

    fn auto_configure_camera(&mut self, width: u32, height: u32) {
        self.record(VoCall::Configure(width, height));
    }

    fn process_frame(&mut self, width: u32, height: u32, _pixels: &[u8]) -> Option<ViewEstimate> {
        self.record(VoCall::Process(width, height));
        *self.estimate.lock().unwrap()
    }

    fn reset(&mut self) {
        self.record(VoCall::Reset);
    }

    fn destroy(&mut self) {
        self.record(VoCall::Destroy);
    }

    fn capabilities(&self) -> VoCapabilities {
        self.capabilities
    }
}

pub struct FakeVoProvider {
    template: FakeVo,
    created: Arc<AtomicUsize>,
}

impl FakeVoProvider {
    pub fn new(template: FakeVo) -> Self {
        Self {
            template,
            created: Arc::default(),
        }
    }

    pub fn created(&self) -> Arc<AtomicUsize> {
        self.created.clone()
    }
}

impl VoProvider for FakeVoProvider {
    fn create(&self) -> Option<Box<dyn VoEngine>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(self.template.clone()))
    }
}

#[derive(Clone)]
pub struct FakeCamera {
    size: Option<FrameSize>,
    stops: Arc<AtomicUsize>,
    switches: Arc<AtomicUsize>,
    fail_switch: bool,
    journal: Option<Journal>,
}

impl FakeCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Some(FrameSize { width, height }),
            stops: Arc::default(),
            switches: Arc::default(),
            fail_switch: false,
            journal: None,
        }
    }

    pub fn without_metadata() -> Self {
        Self {
            size: None,
            ..Self::new(0, 0)
        }
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn failing_switch(mut self) -> Self {
        self.fail_switch = true;
        self
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn switches(&self) -> usize {
        self.switches.load(Ordering::SeqCst)
    }
}

impl CameraStream for FakeCamera {
    fn frame_size(&self) -> Option<FrameSize> {
        self.size
    }

    fn read_frame(&mut self) -> Option<Frame> {
        let size = self.size?;
        Some(Frame {
            width: size.width,
            height: size.height,
            pixels: vec![128; (size.width * size.height * 4) as usize],
        })
    }

    fn switch_camera(&mut self) -> Result<()> {
        if self.fail_switch {
            return Err(ArError::CameraSwitch("no other camera".into()));
        }
        self.switches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(journal) = &self.journal {
            journal.push("camera.stop");
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MediaState {
    loaded: Vec<String>,
    active: usize,
    released: usize,
    natural_size: Option<(u32, u32)>,
    reject_plays: u32,
    play_attempts: u32,
    fail_next_load: bool,
    next_texture: u64,
    journal: Option<Journal>,
}

#[derive(Clone, Default)]
pub struct FakeMediaFactory {
    state: Arc<Mutex<MediaState>>,
}

impl FakeMediaFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(self, journal: &Journal) -> Self {
        self.state.lock().unwrap().journal = Some(journal.clone());
        self
    }

    pub fn loaded(&self) -> Vec<String> {
        self.state.lock().unwrap().loaded.clone()
    }

    pub fn active(&self) -> usize {
        self.state.lock().unwrap().active
    }

    pub fn released(&self) -> usize {
        self.state.lock().unwrap().released
    }

    pub fn play_attempts(&self) -> u32 {
        self.state.lock().unwrap().play_attempts
    }

    pub fn set_natural_size(&self, width: u32, height: u32) {
        self.state.lock().unwrap().natural_size = Some((width, height));
    }

    pub fn reject_plays(&self, count: u32) {
        self.state.lock().unwrap().reject_plays = count;
    }

    pub fn fail_next_load(&self) {
        self.state.lock().unwrap().fail_next_load = true;
    }
}

impl MediaFactory for FakeMediaFactory {
    fn load(&mut self, source: &MediaSource) -> Result<Box<dyn OverlayMedia>> {
        let mut state = self.state.lock().unwrap();
        state.loaded.push(source.id.clone());
        if std::mem::take(&mut state.fail_next_load) {
            return Err(ArError::MediaLoad {
                source_id: source.id.clone(),
                reason: "not found".into(),
            });
        }
        state.active += 1;
        state.next_texture += 1;
        Ok(Box::new(FakeMedia {
            state: self.state.clone(),
            texture: TextureHandle(state.next_texture),
            released: false,
        }))
    }
}

struct FakeMedia {
    state: Arc<Mutex<MediaState>>,
    texture: TextureHandle,
    released: bool,
}

impl OverlayMedia for FakeMedia {
    fn texture(&self) -> TextureHandle {
        self.texture
    }

    fn natural_size(&self) -> Option<(u32, u32)> {
        self.state.lock().unwrap().natural_size
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.play_attempts += 1;
        if state.reject_plays > 0 {
            state.reject_plays -= 1;
            return Err(ArError::PlaybackRejected("NotAllowedError".into()));
        }
        Ok(())
    }

    fn pause(&mut self) {}

    fn refresh_texture(&mut self) {}

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut state = self.state.lock().unwrap();
        state.active -= 1;
        state.released += 1;
        if let Some(journal) = &state.journal {
            journal.push("media.release");
        }
    }
}

#[derive(Default)]
struct RendererState {
    frames: Vec<FrameDescription>,
    sizes: Vec<(u32, u32)>,
    releases: usize,
    journal: Option<Journal>,
}

#[derive(Clone, Default)]
pub struct FakeRenderer {
    state: Arc<Mutex<RendererState>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(self, journal: &Journal) -> Self {
        self.state.lock().unwrap().journal = Some(journal.clone());
        self
    }

    pub fn frames(&self) -> Vec<FrameDescription> {
        self.state.lock().unwrap().frames.clone()
    }

    pub fn last_frame(&self) -> Option<FrameDescription> {
        self.state.lock().unwrap().frames.last().copied()
    }

    pub fn sizes(&self) -> Vec<(u32, u32)> {
        self.state.lock().unwrap().sizes.clone()
    }

    pub fn releases(&self) -> usize {
        self.state.lock().unwrap().releases
    }
}

impl Renderer for FakeRenderer {
    fn render(&mut self, frame: &FrameDescription) {
        self.state.lock().unwrap().frames.push(*frame);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.state.lock().unwrap().sizes.push((width, height));
    }

    fn release(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.releases += 1;
        if let Some(journal) = &state.journal {
            journal.push("renderer.release");
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("status:").map(str::to_string))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn advance(&mut self, percent: u8, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push(format!("advance:{}:{}", percent, message));
    }

    fn complete(&mut self) {
        self.entries.lock().unwrap().push("complete".into());
    }

    fn show_hint(&mut self) {
        self.entries.lock().unwrap().push("hint".into());
    }

    fn status(&mut self, text: &str) {
        self.entries.lock().unwrap().push(format!("status:{}", text));
    }
}
