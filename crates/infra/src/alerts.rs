//! Outbound operational alerts (Slack webhook, PagerDuty events).
//!
//! Delivery is fire-and-forget on a detached thread: an unreachable alert
//! endpoint must never stall or fail the caller. Failures are logged and
//! dropped.

use std::time::Duration;

use serde_json::json;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(3);
const PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

#[derive(Debug, Clone, Default)]
pub struct AlertClient {
    slack_webhook_url: Option<String>,
    pagerduty_routing_key: Option<String>,
}

impl AlertClient {
    pub fn new(slack_webhook_url: Option<String>, pagerduty_routing_key: Option<String>) -> Self {
        Self {
            slack_webhook_url,
            pagerduty_routing_key,
        }
    }

    /// A client with no configured endpoints; every notify is a no-op.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn queue_depth_alert(&self, depth: usize, threshold: usize) {
        self.notify(&format!(
            "import queue depth {depth} exceeds alert threshold {threshold}"
        ));
    }

    /// Post `summary` to every configured endpoint without waiting for the
    /// responses.
    pub fn notify(&self, summary: &str) {
        if self.slack_webhook_url.is_none() && self.pagerduty_routing_key.is_none() {
            return;
        }
        let client = self.clone();
        let summary = summary.to_string();
        std::thread::spawn(move || client.deliver(&summary));
    }

    fn deliver(&self, summary: &str) {
        let http = match reqwest::blocking::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
        {
            Ok(http) => http,
            Err(error) => {
                tracing::warn!(%error, "alert client construction failed");
                return;
            }
        };

        if let Some(url) = &self.slack_webhook_url {
            let result = http.post(url).json(&json!({ "text": summary })).send();
            if let Err(error) = result {
                tracing::warn!(%error, "slack alert delivery failed");
            }
        }

        if let Some(routing_key) = &self.pagerduty_routing_key {
            let payload = json!({
                "routing_key": routing_key,
                "event_action": "trigger",
                "payload": {
                    "summary": summary,
                    "source": "lingora",
                    "severity": "warning",
                },
            });
            let result = http.post(PAGERDUTY_EVENTS_URL).json(&payload).send();
            if let Err(error) = result {
                tracing::warn!(%error, "pagerduty alert delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_client_is_a_no_op() {
        // No endpoints configured, so no thread is spawned and no panic can
        // surface from delivery.
        AlertClient::disabled().notify("nothing to see");
        AlertClient::disabled().queue_depth_alert(5000, 1000);
    }
}
