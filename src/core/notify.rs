//! Injected user-notification capability

/// Notification levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warn,
    Error,
}

/// User-facing notification sink
///
/// The session layer reports connection and resolution milestones through
/// this instead of reaching for any process-wide channel; hosts plug in
/// whatever surface they render notifications on.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, level: NotifyLevel);
}

/// Discards every notification
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _message: &str, _level: NotifyLevel) {}
}

/// Forwards notifications to the log stream
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info => tracing::info!("{message}"),
            NotifyLevel::Warn => tracing::warn!("{message}"),
            NotifyLevel::Error => tracing::error!("{message}"),
        }
    }
}
