use notify_rust::Notification;

/// Best-effort desktop notification; failures only get logged.
pub fn send(summary: &str, body: &str) {
    if let Err(e) = Notification::new().summary(summary).body(body).show() {
        tracing::debug!(error = %e, "could not show desktop notification");
    }
}
