use std::fmt;

/// Errors raised by the overlay session and its collaborators.
///
/// None of these are fatal to a running session: the orchestrator logs them,
/// reports them to the notifier and degrades (sensor-only tracking, a paused
/// overlay, a skipped subsystem).
#[derive(Debug, thiserror::Error)]
pub enum ArError {
    #[error("Visual odometry engine unavailable")]
    VoUnavailable,

    #[error("Visual odometry init failed: {0}")]
    VoInit(String),

    #[error("Visual odometry worker stopped")]
    VoWorkerStopped,

    #[error("Camera stream unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Camera switch failed: {0}")]
    CameraSwitch(String),

    #[error("Media load failed for '{source_id}': {reason}")]
    MediaLoad { source_id: String, reason: String },

    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("Missing host anchor: {0}")]
    MissingAnchor(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timeout waiting for data")]
    Timeout,

    #[error("Channel disconnected")]
    ChannelDisconnected,
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &ArError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_roundtrip() {
        let slot = LastError::new();
        assert!(slot.as_ptr().is_null());

        slot.set(&ArError::MissingAnchor("renderer"));
        let ptr = slot.as_ptr();
        assert!(!ptr.is_null());
        let text = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(text.to_str().unwrap(), "Missing host anchor: renderer");

        slot.clear();
        assert!(slot.as_ptr().is_null());
    }

    #[test]
    fn test_media_error_message() {
        let err = ArError::MediaLoad {
            source_id: "sticker.mp4".into(),
            reason: "404".into(),
        };
        assert_eq!(err.to_string(), "Media load failed for 'sticker.mp4': 404");
    }
}
