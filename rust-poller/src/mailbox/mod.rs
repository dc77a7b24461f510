//! Mailbox access: listing, fetching and decoding messages.
//!
//! ## Flow
//!
//! ```text
//! list(filter, max) → [MessageSummary] → get(id) → Message → decode_body() → text
//! ```
//!
//! Listings are expected newest first. The poll run relies on that ordering
//! to stop at the first already-seen message.

pub mod decode;
pub mod gmail;
pub mod types;

use async_trait::async_trait;

use crate::error::MailboxError;

pub use decode::decode_body;
pub use gmail::{load_access_token, GmailClient};
pub use types::{DeliveryTime, Message, MessageSummary};

/// An already-authorized mailbox.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Up to `max_results` messages matching `filter`, newest first.
    async fn list(&self, filter: &str, max_results: u32) -> Result<Vec<MessageSummary>, MailboxError>;

    /// Fetch one full message.
    async fn get(&self, id: &str) -> Result<Message, MailboxError>;
}
