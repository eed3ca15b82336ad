use crate::types::{Acceleration, OrientationEvent, OrientationSample};
use std::sync::{Arc, Mutex, MutexGuard};

/// Latest device sensor readings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub orientation: Option<OrientationSample>,
    pub acceleration: Option<Acceleration>,
    /// Physical screen rotation in degrees (0, 90, 180, 270 or -90).
    pub screen_orientation_deg: f64,
}

#[derive(Debug, Default)]
struct SensorState {
    reading: SensorReading,
    discarded: u64,
}

/// Device-orientation pose source.
///
/// Platform callbacks may fire from any thread. Each one overwrites the
/// latest value; the tick reads whatever is newest. Clones share state, so
/// the host keeps one clone for its callbacks and the session keeps another.
#[derive(Debug, Clone, Default)]
pub struct SensorPoseSource {
    state: Arc<Mutex<SensorState>>,
}

impl SensorPoseSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SensorState> {
        // A panicking writer cannot leave a half-written Copy value behind.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a device-orientation event.
    ///
    /// Returns `false` and keeps the previous sample when the event has no
    /// usable azimuth.
    pub fn push_orientation(&self, event: OrientationEvent) -> bool {
        let mut state = self.state();
        match event.sample() {
            Some(sample) => {
                state.reading.orientation = Some(sample);
                true
            }
            None => {
                state.discarded += 1;
                log::debug!("Discarding orientation event without alpha: {:?}", event);
                false
            }
        }
    }

    /// Record a device-motion acceleration sample.
    pub fn push_acceleration(&self, acceleration: Acceleration) {
        self.state().reading.acceleration = Some(acceleration);
    }

    /// Record the current screen rotation.
    pub fn set_screen_orientation(&self, degrees: f64) {
        if degrees.is_finite() {
            self.state().reading.screen_orientation_deg = degrees;
        }
    }

    /// Snapshot of the newest readings.
    pub fn latest(&self) -> SensorReading {
        self.state().reading
    }

    /// Number of malformed orientation events dropped so far.
    pub fn discarded(&self) -> u64 {
        self.state().discarded
    }
}
