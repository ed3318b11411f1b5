//! Alert formatting and delivery sinks.

use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::changes::RegimeChange;
use crate::error::AlertError;

/// Where alert messages go.
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, message: &str) -> Result<(), AlertError>;
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn deliver(&self, message: &str) -> Result<(), AlertError> {
        (**self).deliver(message)
    }
}

/// Plain-text alert body: a header, then one `TICKER: FROM → TO` line per change.
pub fn format_alert(changes: &[RegimeChange]) -> String {
    if changes.is_empty() {
        return "No regime changes today".to_string();
    }
    let mut lines = vec!["Regime changes:".to_string()];
    lines.extend(
        changes
            .iter()
            .map(|c| format!("{}: {} → {}", c.ticker, c.from, c.to)),
    );
    lines.join("\n")
}

/// POSTs `{"text": message}` to a chat-style incoming webhook.
pub struct WebhookSink {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::Delivery(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn deliver(&self, message: &str) -> Result<(), AlertError> {
        self.client
            .post(&self.url)
            .json(&json!({ "text": message }))
            .send()
            .and_then(|resp| resp.error_for_status())
            .map(|_| ())
            .map_err(|e| AlertError::Delivery(e.to_string()))
    }
}

/// Used when no webhook is configured: the message only goes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, message: &str) -> Result<(), AlertError> {
        info!(%message, "no webhook configured, alert logged only");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regimelab_core::Regime;

    #[test]
    fn one_line_per_change() {
        let changes = vec![
            RegimeChange {
                ticker: "AAA".into(),
                from: Regime::Bear,
                to: Regime::Bull,
            },
            RegimeChange {
                ticker: "BBB".into(),
                from: Regime::Bull,
                to: Regime::Sideways,
            },
        ];
        assert_eq!(
            format_alert(&changes),
            "Regime changes:\nAAA: Bear → Bull\nBBB: Bull → Sideways"
        );
    }

    #[test]
    fn empty_changes_message() {
        assert_eq!(format_alert(&[]), "No regime changes today");
    }

    #[test]
    fn unreachable_webhook_is_a_delivery_error() {
        // Port 9 on localhost: nothing listens, connection is refused fast.
        let sink = WebhookSink::new("http://127.0.0.1:9/hook", Duration::from_secs(2)).unwrap();
        assert!(matches!(sink.deliver("hi"), Err(AlertError::Delivery(_))));
    }

    #[test]
    fn log_sink_always_succeeds() {
        assert!(LogSink.deliver("Regime changes:\nAAA: Bear → Bull").is_ok());
    }
}
