//! Visual odometry capability.
//!
//! The engine itself is opaque: it eats RGBA frames and returns view
//! matrices. It is optional at every level. A provider may report it
//! unavailable, `init` may fail, and every call site goes through
//! [`VoHandle`], which only exists once an engine is ready.

use crate::config::VoExecution;
use crate::types::{Frame, ViewEstimate, VoCapabilities};
use crate::vo_worker::VoWorker;
use crate::Result;

/// Engine init parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoInitConfig {
    pub fast_threshold: u32,
    pub max_features: u32,
}

/// An opaque visual odometry engine.
pub trait VoEngine: Send {
    /// One-time setup. May be slow; runs off the tick thread.
    fn init(&mut self, config: &VoInitConfig) -> Result<()>;

    /// Derive camera intrinsics from the processed frame dimensions.
    fn auto_configure_camera(&mut self, width: u32, height: u32);

    /// Track one RGBA8 frame. `None` when the engine produced nothing.
    fn process_frame(&mut self, width: u32, height: u32, pixels: &[u8]) -> Option<ViewEstimate>;

    /// Drop the map and restart tracking.
    fn reset(&mut self);

    /// Release everything the engine holds.
    fn destroy(&mut self);

    fn capabilities(&self) -> VoCapabilities {
        VoCapabilities::all()
    }
}

/// Resolves an engine instance, or `None` when the platform has none.
pub trait VoProvider {
    fn create(&self) -> Option<Box<dyn VoEngine>>;
}

/// Provider for builds without visual odometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVo;

impl VoProvider for NoVo {
    fn create(&self) -> Option<Box<dyn VoEngine>> {
        None
    }
}

/// A ready engine, processed inline or on a worker.
pub enum VoHandle {
    Inline {
        engine: Box<dyn VoEngine>,
        capabilities: VoCapabilities,
    },
    Worker(VoWorker),
}

impl VoHandle {
    /// Wrap an initialized engine.
    pub fn new(engine: Box<dyn VoEngine>, execution: VoExecution) -> Result<VoHandle> {
        match execution {
            VoExecution::Inline => {
                let capabilities = engine.capabilities();
                Ok(VoHandle::Inline {
                    engine,
                    capabilities,
                })
            }
            VoExecution::Worker => Ok(VoHandle::Worker(VoWorker::start(engine)?)),
        }
    }

    pub fn capabilities(&self) -> VoCapabilities {
        match self {
            VoHandle::Inline { capabilities, .. } => *capabilities,
            VoHandle::Worker(worker) => worker.capabilities(),
        }
    }

    pub fn auto_configure_camera(&mut self, width: u32, height: u32) {
        if !self.capabilities().contains(VoCapabilities::AUTO_CALIBRATION) {
            return;
        }
        match self {
            VoHandle::Inline { engine, .. } => engine.auto_configure_camera(width, height),
            VoHandle::Worker(worker) => worker.auto_configure_camera(width, height),
        }
    }

    /// Process a frame.
    ///
    /// Inline engines answer for this frame. Workers return the newest
    /// estimate computed since the previous call, i.e. for an earlier frame.
    pub fn process(&mut self, frame: Frame) -> Option<ViewEstimate> {
        match self {
            VoHandle::Inline { engine, .. } => {
                engine.process_frame(frame.width, frame.height, &frame.pixels)
            }
            VoHandle::Worker(worker) => {
                let previous = worker.latest();
                worker.submit(frame);
                previous
            }
        }
    }

    pub fn reset(&mut self) {
        if !self.capabilities().contains(VoCapabilities::RESET) {
            return;
        }
        match self {
            VoHandle::Inline { engine, .. } => engine.reset(),
            VoHandle::Worker(worker) => worker.reset(),
        }
    }

    /// Destroy the engine. Consumes the handle so it cannot be used again.
    pub fn destroy(self) {
        match self {
            VoHandle::Inline { mut engine, .. } => engine.destroy(),
            VoHandle::Worker(worker) => worker.stop(),
        }
        log::info!("Visual odometry engine released");
    }
}
