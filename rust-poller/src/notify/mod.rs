//! Outbound notification channel.

pub mod webhook;

use async_trait::async_trait;

use crate::error::NotifyError;

pub use webhook::{WebhookNotifier, WebhookPayload};

/// Delivers extracted text to a fixed destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, text: &str, display_name: &str) -> Result<(), NotifyError>;
}
