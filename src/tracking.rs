use crate::config::{VoConfig, VoExecution};
use crate::types::TrackingMode;
use crate::vo::{VoEngine, VoHandle, VoInitConfig, VoProvider};
use crate::{ArError, Result};
use crossbeam_channel::Receiver;
use std::thread::JoinHandle;
use std::time::Duration;

/// An engine initializing on its own thread.
struct PendingInit {
    outcome: Receiver<Result<Box<dyn VoEngine>>>,
    thread: JoinHandle<()>,
}

impl PendingInit {
    /// Wait for the init thread and destroy whatever engine it produced.
    fn abandon(self) {
        if self.thread.join().is_err() {
            log::warn!("VO init thread panicked");
        }
        if let Ok(Ok(mut engine)) = self.outcome.try_recv() {
            engine.destroy();
        }
    }
}

/// Run `engine.init` on a thread built by `builder`.
///
/// If the thread cannot be spawned the engine is destroyed here.
fn spawn_init(
    builder: std::thread::Builder,
    engine: Box<dyn VoEngine>,
    config: VoInitConfig,
) -> Result<PendingInit> {
    // The engine travels through a channel so it can be taken back when
    // spawning fails.
    let (handoff_tx, handoff) = crossbeam_channel::bounded::<Box<dyn VoEngine>>(1);
    if let Err(crossbeam_channel::SendError(mut engine)) = handoff_tx.send(engine) {
        engine.destroy();
        return Err(ArError::ChannelDisconnected);
    }
    let thread_handoff = handoff.clone();
    let (sender, outcome) = crossbeam_channel::bounded(1);

    let spawned = builder.spawn(move || {
        let Ok(mut engine) = thread_handoff.recv() else {
            return;
        };
        let result = match engine.init(&config) {
            Ok(()) => Ok(engine),
            Err(e) => {
                engine.destroy();
                Err(e)
            }
        };
        // Nobody waiting any more: release what was built.
        if let Err(crossbeam_channel::SendError(Ok(mut engine))) = sender.send(result) {
            engine.destroy();
        }
    });

    match spawned {
        Ok(thread) => Ok(PendingInit { outcome, thread }),
        Err(e) => {
            if let Ok(mut engine) = handoff.try_recv() {
                engine.destroy();
            }
            Err(ArError::VoInit(format!("Failed to spawn VO init thread: {}", e)))
        }
    }
}

/// Lifecycle of the optional visual odometry engine.
enum VoSlot {
    Absent,
    Initializing(PendingInit),
    Ready(VoHandle),
}

/// Coarse view of [`VoSlot`] for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoStatus {
    Absent,
    Initializing,
    Ready,
}

/// Tracking mode state machine.
///
/// Starts in [`TrackingMode::Sensor`]. Entering a VO mode creates the engine
/// lazily and initializes it on a background thread; the outcome is picked
/// up by [`poll_vo`](Self::poll_vo) on a later tick. A failed or missing
/// engine forces the mode back to sensor.
pub struct TrackingModeController {
    mode: TrackingMode,
    vo: VoSlot,
    provider: Box<dyn VoProvider>,
    init_config: VoInitConfig,
    execution: VoExecution,
}

impl TrackingModeController {
    pub fn new(provider: Box<dyn VoProvider>, config: &VoConfig) -> Self {
        Self {
            mode: TrackingMode::Sensor,
            vo: VoSlot::Absent,
            provider,
            init_config: VoInitConfig {
                fast_threshold: config.fast_threshold,
                max_features: config.max_features,
            },
            execution: config.execution,
        }
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn vo_status(&self) -> VoStatus {
        match self.vo {
            VoSlot::Absent => VoStatus::Absent,
            VoSlot::Initializing(_) => VoStatus::Initializing,
            VoSlot::Ready(_) => VoStatus::Ready,
        }
    }

    /// The engine, once ready.
    pub fn vo_mut(&mut self) -> Option<&mut VoHandle> {
        match &mut self.vo {
            VoSlot::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    /// Switch mode. Takes effect on the next tick.
    ///
    /// Entering `slam` or `hybrid` without an engine starts initialization.
    /// When no engine can be created the mode stays `sensor` and the reason
    /// is returned.
    pub fn set_mode(&mut self, mode: TrackingMode) -> Result<()> {
        if mode != self.mode {
            log::info!("Tracking mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;

        if mode.uses_vo() && matches!(self.vo, VoSlot::Absent) {
            if let Err(e) = self.start_vo_init() {
                self.fall_back(&e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn start_vo_init(&mut self) -> Result<()> {
        let engine = self.provider.create().ok_or(ArError::VoUnavailable)?;
        let config = self.init_config;
        let builder = std::thread::Builder::new().name("arsticker-vo-init".into());
        let pending = spawn_init(builder, engine, config)?;

        log::info!(
            "Initializing VO (fast_threshold={}, max_features={})",
            config.fast_threshold,
            config.max_features
        );
        self.vo = VoSlot::Initializing(pending);
        Ok(())
    }

    fn fall_back(&mut self, err: &ArError) {
        log::warn!("VO unavailable, falling back to sensor tracking: {}", err);
        self.vo = VoSlot::Absent;
        self.mode = TrackingMode::Sensor;
    }

    fn finish_init(&mut self, outcome: Result<Box<dyn VoEngine>>) -> Result<()> {
        let handle = outcome.and_then(|engine| VoHandle::new(engine, self.execution));
        match handle {
            Ok(handle) => {
                log::info!("VO ready ({:?})", self.execution);
                self.vo = VoSlot::Ready(handle);
                Ok(())
            }
            Err(e) => {
                self.fall_back(&e);
                Err(e)
            }
        }
    }

    /// Collect a finished initialization without blocking.
    ///
    /// Returns `None` while nothing changed, `Some(Ok(()))` when the engine
    /// became ready and `Some(Err(_))` when it failed and the mode fell back.
    pub fn poll_vo(&mut self) -> Option<Result<()>> {
        let VoSlot::Initializing(pending) = &self.vo else {
            return None;
        };
        let outcome = match pending.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(crossbeam_channel::TryRecvError::Empty) => return None,
            Err(crossbeam_channel::TryRecvError::Disconnected) => Err(ArError::ChannelDisconnected),
        };
        Some(self.finish_init(outcome))
    }

    /// Block until a pending initialization finishes.
    pub fn await_vo(&mut self, timeout: Duration) -> Result<()> {
        let receiver = match &self.vo {
            VoSlot::Ready(_) => return Ok(()),
            VoSlot::Absent => return Err(ArError::VoUnavailable),
            VoSlot::Initializing(pending) => &pending.outcome,
        };
        let outcome = match receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => return Err(ArError::Timeout),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(ArError::ChannelDisconnected)
            }
        };
        self.finish_init(outcome)
    }

    /// Restart VO tracking in place, if an engine is ready.
    pub fn reset_vo(&mut self) {
        if let Some(vo) = self.vo_mut() {
            vo.reset();
        }
    }

    /// Release the engine. Returns whether one was held.
    ///
    /// A pending initialization is waited for and its engine destroyed.
    pub fn release(&mut self) -> bool {
        match std::mem::replace(&mut self.vo, VoSlot::Absent) {
            VoSlot::Ready(handle) => {
                handle.destroy();
                true
            }
            VoSlot::Initializing(pending) => {
                pending.abandon();
                true
            }
            VoSlot::Absent => false,
        }
    }
}
