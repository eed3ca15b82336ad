use crate::types::{Frame, ViewEstimate, VoCapabilities};
use crate::vo::VoEngine;
use crate::{ArError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the worker waits for a frame before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Control {
    Configure { width: u32, height: u32 },
    Reset,
}

/// Visual odometry engine running on its own thread.
///
/// Used when frame processing does not fit the tick budget. Frames are
/// submitted without blocking (a busy worker drops the new frame) and
/// estimates are collected on a later tick.
pub struct VoWorker {
    frames: Sender<Frame>,
    control: Sender<Control>,
    estimates: Receiver<ViewEstimate>,
    capabilities: VoCapabilities,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl VoWorker {
    /// Move `engine` onto a new worker thread.
    pub(crate) fn start(engine: Box<dyn VoEngine>) -> Result<VoWorker> {
        let capabilities = engine.capabilities();
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let (estimate_tx, estimate_rx) = crossbeam_channel::bounded(4);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("arsticker-vo".into())
            .spawn(move || {
                vo_worker_loop(engine, frame_rx, control_rx, estimate_tx, stop_clone);
            })
            .map_err(|e| ArError::VoInit(format!("Failed to spawn VO worker: {}", e)))?;

        Ok(VoWorker {
            frames: frame_tx,
            control: control_tx,
            estimates: estimate_rx,
            capabilities,
            stop_flag,
            thread: Some(thread),
        })
    }

    pub fn capabilities(&self) -> VoCapabilities {
        self.capabilities
    }

    /// Queue a frame unless the worker is still busy with the previous one.
    pub fn submit(&self, frame: Frame) {
        if let Err(e) = self.frames.try_send(frame) {
            match e {
                crossbeam_channel::TrySendError::Full(_) => {
                    log::trace!("VO worker busy, dropping frame");
                }
                crossbeam_channel::TrySendError::Disconnected(_) => {
                    log::warn!("VO worker gone, frame discarded");
                }
            }
        }
    }

    /// Newest estimate produced since the last call, if any.
    pub fn latest(&self) -> Option<ViewEstimate> {
        self.estimates.try_iter().last()
    }

    /// Wait for the next estimate.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ViewEstimate> {
        self.estimates.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => ArError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => ArError::VoWorkerStopped,
        })
    }

    pub fn auto_configure_camera(&self, width: u32, height: u32) {
        if self.control.send(Control::Configure { width, height }).is_err() {
            log::warn!("VO worker gone, camera configuration discarded");
        }
    }

    pub fn reset(&self) {
        if self.control.send(Control::Reset).is_err() {
            log::warn!("VO worker gone, reset discarded");
        }
        // Estimates from before the reset are stale.
        while self.estimates.try_recv().is_ok() {}
    }

    /// Check if the worker thread is still running.
    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Stop the worker, destroy the engine and wait for the thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for VoWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn vo_worker_loop(
    mut engine: Box<dyn VoEngine>,
    frames: Receiver<Frame>,
    control: Receiver<Control>,
    estimates: Sender<ViewEstimate>,
    stop_flag: Arc<AtomicBool>,
) {
    log::info!("VO worker started");

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("VO worker stopping (stop flag set)");
            break;
        }

        let frame = match frames.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => Some(frame),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                log::info!("VO frame channel disconnected, stopping worker");
                break;
            }
        };

        // Control sent before a frame must apply before that frame.
        for command in control.try_iter() {
            match command {
                Control::Configure { width, height } => engine.auto_configure_camera(width, height),
                Control::Reset => engine.reset(),
            }
        }

        let Some(frame) = frame else {
            continue;
        };

        let Some(estimate) = engine.process_frame(frame.width, frame.height, &frame.pixels) else {
            continue;
        };

        if let Err(e) = estimates.try_send(estimate) {
            match e {
                crossbeam_channel::TrySendError::Full(_) => {
                    log::trace!("VO estimate channel full, dropping estimate");
                }
                crossbeam_channel::TrySendError::Disconnected(_) => {
                    log::info!("VO estimate channel disconnected, stopping worker");
                    break;
                }
            }
        }
    }

    engine.destroy();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeVo, VoCall};

    fn frame(width: u32) -> Frame {
        Frame {
            width,
            height: 8,
            pixels: vec![0; (width * 8 * 4) as usize],
        }
    }

    #[test]
    fn test_worker_processes_and_stops() {
        let fake = FakeVo::tracking();
        let worker = VoWorker::start(Box::new(fake.clone())).unwrap();
        assert!(worker.is_active());

        worker.auto_configure_camera(160, 120);
        worker.submit(frame(8));
        let estimate = worker.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(estimate.tracking);

        worker.stop();
        let calls = fake.calls();
        assert_eq!(calls.first(), Some(&VoCall::Configure(160, 120)));
        assert!(calls.contains(&VoCall::Process(8, 8)));
        assert_eq!(calls.last(), Some(&VoCall::Destroy));
    }

    #[test]
    fn test_drop_destroys_engine_once() {
        let fake = FakeVo::tracking();
        {
            let _worker = VoWorker::start(Box::new(fake.clone())).unwrap();
        }
        let destroys = fake.calls().iter().filter(|c| **c == VoCall::Destroy).count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn test_latest_empty_before_any_frame() {
        let worker = VoWorker::start(Box::new(FakeVo::tracking())).unwrap();
        assert!(worker.latest().is_none());
        assert!(matches!(
            worker.recv_timeout(Duration::from_millis(10)),
            Err(ArError::Timeout)
        ));
    }
}
