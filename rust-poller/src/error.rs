//! Error types for the poller.
//!
//! Each collaborator has its own error enum. [`RunError`] wraps them and
//! records which stage of a poll run failed.

use std::path::PathBuf;

/// Configuration errors raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Watermark persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("Failed to read watermark file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse watermark {value:?}: {source}")]
    Parse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Watermark {value:?} is not in UTC")]
    NotUtc { value: String },

    #[error("Lookback of {hours} hours reaches before the earliest representable time")]
    LookbackOutOfRange { hours: i64 },

    #[error("Failed to write watermark file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Mailbox API errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Mailbox request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mailbox returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid mailbox response: {0}")]
    InvalidResponse(String),

    #[error("Invalid mailbox URL: {0}")]
    InvalidUrl(String),
}

/// Message body decoding errors. These only ever skip a single message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Body is not valid URL-safe base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Body is not a parseable MIME message: {0}")]
    Mime(#[from] mailparse::MailParseError),

    #[error("Message has no text/plain part")]
    NoTextPart,
}

/// Notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// A fatal poll-run failure. The watermark is never saved after one of these.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Unable to load watermark: {0}")]
    LoadWatermark(#[source] WatermarkError),

    #[error("Unable to retrieve messages: {0}")]
    ListMessages(#[source] MailboxError),

    #[error("Unable to retrieve message {id}: {source}")]
    FetchMessage {
        id: String,
        #[source]
        source: MailboxError,
    },

    #[error("Unable to notify for message {id}: {source}")]
    Notify {
        id: String,
        #[source]
        source: NotifyError,
    },

    #[error("Unable to save watermark: {0}")]
    SaveWatermark(#[source] WatermarkError),
}

impl RunError {
    /// Name of the run stage that failed, for logging.
    pub fn stage(&self) -> &'static str {
        match self {
            RunError::LoadWatermark(_) => "load_watermark",
            RunError::ListMessages(_) => "list_messages",
            RunError::FetchMessage { .. } => "fetch_message",
            RunError::Notify { .. } => "notify",
            RunError::SaveWatermark(_) => "save_watermark",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_stage_names() {
        let err = RunError::ListMessages(MailboxError::Status {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(err.stage(), "list_messages");

        let err = RunError::Notify {
            id: "abc".to_string(),
            source: NotifyError::Status {
                status: 404,
                body: "no_team".to_string(),
            },
        };
        assert_eq!(err.stage(), "notify");
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("404"));
    }
}
