use estatedesk_application::{Notice, Notifier};
use tracing::{info, warn};

/// Notifier that writes user notices to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::Success(_) => info!(notice = notice.text(), "success"),
            Notice::Error(_) => warn!(notice = notice.text(), "error"),
            Notice::SessionExpired => warn!(notice = notice.text(), "session expired"),
        }
    }
}
