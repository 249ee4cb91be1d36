//! Alert and confirmation capability handed to the session controller.

/// User-facing notifications. Injected into
/// [`SessionController`](super::SessionController) rather than reached through
/// shared module state.
pub trait Notifier: Send + Sync {
    /// Show a message the user must acknowledge.
    fn alert(&self, message: &str);

    /// Ask a yes/no question. `true` proceeds.
    fn confirm(&self, message: &str) -> bool;
}

/// Notifier for non-interactive use: alerts go to the log, confirmations get
/// a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    pub assume_yes: bool,
}

impl LogNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn confirm(&self, message: &str) -> bool {
        if !self.assume_yes {
            tracing::warn!("{} (declined, pass --yes to confirm)", message);
        }
        self.assume_yes
    }
}
