/// Host-side progress and status surface.
///
/// Loading screens, hint banners and the status line live in the host UI;
/// the session only reports to them.
pub trait Notifier {
    /// Startup progress, `percent` in [0, 100].
    fn advance(&mut self, percent: u8, message: &str);

    /// Startup finished.
    fn complete(&mut self);

    /// Show the how-to-interact hint.
    fn show_hint(&mut self);

    /// One-line status (tracking info, degradations).
    fn status(&mut self, text: &str);
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn advance(&mut self, percent: u8, message: &str) {
        log::info!("[{:>3}%] {}", percent.min(100), message);
    }

    fn complete(&mut self) {
        log::info!("Ready");
    }

    fn show_hint(&mut self) {
        log::info!("Drag to move, pinch or scroll to resize, double tap to place again");
    }

    fn status(&mut self, text: &str) {
        log::debug!("status: {}", text);
    }
}
