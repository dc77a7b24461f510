//! Incoming-webhook notifier (Slack-compatible JSON body).

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};
use url::Url;

use super::Notifier;
use crate::error::NotifyError;

/// JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload<'a> {
    pub text: &'a str,
    pub username: &'a str,
}

/// Posts notifications to an incoming-webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn post(&self, text: &str, display_name: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            text,
            username: display_name,
        };

        let response = match self.http.post(self.url.clone()).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    error!(error = %e, "webhook_post_timeout");
                } else {
                    error!(error = %e, "webhook_post_error");
                }
                return Err(NotifyError::Request(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status_code = status.as_u16(), body = %body, "webhook_post_rejected");
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            status_code = status.as_u16(),
            text_length = text.len(),
            username = %display_name,
            "webhook_post_complete"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serialization() {
        let payload = WebhookPayload {
            text: "■お届け予定日時：10/6\n",
            username: "YAMATO",
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "■お届け予定日時：10/6\n", "username": "YAMATO"})
        );
    }
}
