const APP_NAME: &str = "shotlift";

/// Posts a desktop notification; failures only reach the log.
pub fn send(summary: &str, body: impl Into<String>) {
    let body = body.into();
    tracing::debug!(summary, body = %body, "sending desktop notification");
    if let Err(err) = notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(summary)
        .body(&body)
        .icon("camera-photo")
        .show()
    {
        tracing::warn!(summary, "desktop notification failed: {err}");
    }
}
