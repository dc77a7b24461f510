//! Yamato Poller - forwards parcel delivery notices from a mailbox to a chat webhook.
//!
//! Each invocation is one poll run; scheduling (cron, systemd timer) is
//! external and must not overlap runs.
//!
//! ## Architecture
//!
//! ```text
//! Watermark store → Mailbox (list + get) → decode → Template extractor → Notifier
//!        ↑                                                                  │
//!        └──────────────────── save newest delivery time ───────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod mailbox;
pub mod notify;
pub mod poller;
pub mod watermark;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, DecodeError, MailboxError, NotifyError, RunError, WatermarkError};
pub use extract::{extract, Extraction, Template};
pub use mailbox::{GmailClient, Mailbox, Message, MessageSummary};
pub use notify::{Notifier, WebhookNotifier};
pub use poller::{Poller, RunReport, PAGE_SIZE};
pub use watermark::{FileWatermarkStore, MemoryWatermarkStore, Watermark, WatermarkStore};
