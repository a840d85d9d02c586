//! Outbound failure notification. Delivery is fire-and-forget: a failed
//! delivery is logged and never turned into a pipeline failure.

use log::error;

/// Receives `{subject, body}` notifications on terminal pipeline failure.
/// The actual transport (mail, chat webhook) lives behind this trait in the
/// deployment; the library ships a log-based default.
pub trait Notifier: Send + Sync {
    fn notify(&self, subject: &str, body: &str);
}

/// Default notifier: writes the notification to the error log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, body: &str) {
        error!("{}\n{}", subject, body);
    }
}
