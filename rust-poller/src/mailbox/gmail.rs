//! Gmail REST API mailbox client.
//!
//! Uses a bearer token obtained out of band (the OAuth flow and token refresh
//! live outside this program). Messages are fetched in `raw` format so the
//! body can be decoded with [`crate::mailbox::decode_body`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::types::{DeliveryTime, Message, MessageSummary};
use super::Mailbox;
use crate::error::MailboxError;

/// Response of `users.messages.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMessagesResponse {
    /// Absent when nothing matches
    #[serde(default)]
    messages: Option<Vec<MessageRef>>,
    #[serde(default)]
    result_size_estimate: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Response of `users.messages.get` with `format=raw`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessageResponse {
    id: String,
    /// Epoch milliseconds as a decimal string
    internal_date: String,
    raw: String,
}

impl RawMessageResponse {
    fn into_message(self) -> Result<Message, MailboxError> {
        let millis: i64 = self.internal_date.parse().map_err(|e| {
            MailboxError::InvalidResponse(format!(
                "internalDate {:?} of message {}: {}",
                self.internal_date, self.id, e
            ))
        })?;

        Ok(Message::new(self.id, DeliveryTime::from_millis(millis), self.raw))
    }
}

/// Cached OAuth token, as written by the authorization helper.
#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    expiry: Option<String>,
}

/// Read the access token from a cached OAuth token file.
///
/// A missing or unreadable file is a startup error. An expired token is only
/// warned about; the API call will fail and name the problem.
pub async fn load_access_token(path: &Path) -> Result<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Unable to read credential file {}", path.display()))?;

    let token: StoredToken = serde_json::from_str(&content)
        .with_context(|| format!("Unable to parse credential file {}", path.display()))?;

    if token.access_token.trim().is_empty() {
        bail!("Credential file {} has an empty access_token", path.display());
    }

    if let Some(expiry) = token.expiry.as_deref() {
        match DateTime::parse_from_rfc3339(expiry) {
            Ok(at) if at.with_timezone(&Utc) <= Utc::now() => {
                warn!(path = %path.display(), expiry = %expiry, "gmail_token_expired");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), expiry = %expiry, error = %e, "gmail_token_expiry_unparsed");
            }
        }
    }

    info!(path = %path.display(), "gmail_token_loaded");

    Ok(token.access_token)
}

/// Mailbox backed by the Gmail API.
#[derive(Clone)]
pub struct GmailClient {
    http: Client,
    base: Url,
    user_id: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(
        http: Client,
        base: Url,
        user_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base,
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// `{base}/gmail/v1/users/{user}/messages[/{id}]`
    fn messages_url(&self, id: Option<&str>) -> Result<Url, MailboxError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| MailboxError::InvalidUrl(self.base.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["gmail", "v1", "users", self.user_id.as_str(), "messages"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, MailboxError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list(&self, filter: &str, max_results: u32) -> Result<Vec<MessageSummary>, MailboxError> {
        let url = self.messages_url(None)?;
        let query = [("q", filter.to_string()), ("maxResults", max_results.to_string())];

        let response: ListMessagesResponse = self.get_json(url, &query).await?;
        let summaries: Vec<MessageSummary> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageSummary::new(m.id))
            .collect();

        info!(
            filter = %filter,
            max_results = max_results,
            returned = summaries.len(),
            result_size_estimate = ?response.result_size_estimate,
            "gmail_messages_listed"
        );

        Ok(summaries)
    }

    async fn get(&self, id: &str) -> Result<Message, MailboxError> {
        let url = self.messages_url(Some(id))?;
        let query = [("format", "raw".to_string())];

        let response: RawMessageResponse = self.get_json(url, &query).await?;
        let message = response.into_message()?;

        info!(
            message_id = %message.id,
            delivered_at = %message.delivered_at,
            raw_length = message.encoded_body.len(),
            "gmail_message_fetched"
        );

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GmailClient {
        GmailClient::new(Client::new(), Url::parse(base).unwrap(), "me", "token")
    }

    #[test]
    fn test_messages_url() {
        let gmail = client("https://gmail.googleapis.com");
        assert_eq!(
            gmail.messages_url(None).unwrap().as_str(),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages"
        );
        assert_eq!(
            gmail.messages_url(Some("18b2f0c1")).unwrap().as_str(),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/18b2f0c1"
        );
    }

    #[test]
    fn test_messages_url_with_base_path() {
        let gmail = client("http://localhost:8080/proxy/");
        assert_eq!(
            gmail.messages_url(None).unwrap().as_str(),
            "http://localhost:8080/proxy/gmail/v1/users/me/messages"
        );
    }

    #[test]
    fn test_list_response_deserialization() {
        let json = r#"{
            "messages": [
                {"id": "m2", "threadId": "t2"},
                {"id": "m1", "threadId": "t1"}
            ],
            "resultSizeEstimate": 2
        }"#;

        let response: ListMessagesResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<String> = response.messages.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
        assert_eq!(response.result_size_estimate, Some(2));
    }

    #[test]
    fn test_list_response_empty() {
        let response: ListMessagesResponse =
            serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(response.messages.is_none());
    }

    #[test]
    fn test_raw_message_into_message() {
        let json = r#"{
            "id": "m1",
            "threadId": "t1",
            "internalDate": "1728104400123",
            "raw": "U3ViamVjdDogaGk="
        }"#;

        let response: RawMessageResponse = serde_json::from_str(json).unwrap();
        let message = response.into_message().unwrap();

        assert_eq!(message.id, "m1");
        assert_eq!(message.delivered_at, DeliveryTime::from_millis(1_728_104_400_123));
        assert_eq!(message.encoded_body, "U3ViamVjdDogaGk=");
    }

    #[test]
    fn test_raw_message_bad_internal_date() {
        let response = RawMessageResponse {
            id: "m1".to_string(),
            internal_date: "yesterday".to_string(),
            raw: String::new(),
        };
        assert!(matches!(
            response.into_message(),
            Err(MailboxError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_load_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token":"ya29.abc","token_type":"Bearer","refresh_token":"1//x","expiry":"2099-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(load_access_token(&path).await.unwrap(), "ya29.abc");
    }

    #[tokio::test]
    async fn test_load_access_token_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_access_token(&dir.path().join("absent.json")).await.unwrap_err();
        assert!(err.to_string().contains("Unable to read credential file"));
    }

    #[tokio::test]
    async fn test_load_access_token_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"access_token":"  "}"#).unwrap();

        assert!(load_access_token(&path).await.is_err());
    }
}
