//! Poll run: the watermark protocol around template extraction.
//!
//! One run:
//! 1. Loads the watermark
//! 2. Lists the newest matching messages (one page of [`PAGE_SIZE`])
//! 3. Fetches them in order, stopping at the first one older than the watermark
//! 4. Extracts and notifies for every fresh message that matches a template
//! 5. Saves the newest delivery time seen as the next watermark
//!
//! Any failure in steps 1-5 except body decoding aborts the run before the
//! save, so the next run starts again from the old watermark. Notifications
//! are therefore at-least-once; a notifier failure deliberately fails the
//! whole run rather than dropping a notification.
//!
//! The mailbox must list messages newest first. A fresh message listed after
//! a stale one is never looked at.

use tracing::{info, warn};

use crate::error::{DecodeError, RunError};
use crate::extract::{extract, Extraction};
use crate::mailbox::{decode_body, Mailbox, Message};
use crate::notify::Notifier;
use crate::watermark::{Watermark, WatermarkStore};

/// Messages requested per run.
pub const PAGE_SIZE: u32 = 5;

/// What happened to a fresh message.
#[derive(Debug)]
pub enum Outcome {
    /// A template matched; the text goes to the notifier.
    Matched(Extraction),
    /// Decoded fine but no template matched.
    NoMatch,
    /// The body could not be decoded; the message is skipped.
    Undecodable(DecodeError),
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Watermark the run started from
    pub previous: Watermark,
    /// Watermark saved at the end
    pub saved: Watermark,
    /// Messages returned by the list query
    pub listed: usize,
    /// Messages at or after the watermark
    pub fresh: usize,
    /// Fresh messages skipped because their body did not decode
    pub undecodable: usize,
    /// Notifications sent
    pub notified: usize,
}

/// Split newest-first messages at the first one strictly older than
/// `watermark`. Returns `(fresh, stale)`; everything from the first stale
/// message on counts as stale.
pub fn split_fresh(mut messages: Vec<Message>, watermark: Watermark) -> (Vec<Message>, Vec<Message>) {
    let cut = messages
        .iter()
        .position(|m| watermark.is_stale(m.delivered_at))
        .unwrap_or(messages.len());
    let stale = messages.split_off(cut);
    (messages, stale)
}

/// The watermark after seeing `fresh`.
pub fn advance_watermark(watermark: Watermark, fresh: &[Message]) -> Watermark {
    fresh
        .iter()
        .fold(watermark, |candidate, m| candidate.advance(m.delivered_at))
}

/// Decode and run extraction on one message.
pub fn extract_message(message: &Message) -> Outcome {
    match decode_body(&message.encoded_body) {
        Ok(body) => match extract(&body) {
            Some(extraction) => Outcome::Matched(extraction),
            None => Outcome::NoMatch,
        },
        Err(e) => Outcome::Undecodable(e),
    }
}

/// Run extraction over every fresh message, keeping mailbox order.
pub fn extract_messages(fresh: &[Message]) -> Vec<Outcome> {
    fresh.iter().map(extract_message).collect()
}

/// Runs poll cycles against injected collaborators.
pub struct Poller<S, M, N> {
    store: S,
    mailbox: M,
    notifier: N,
    display_name: String,
}

impl<S, M, N> Poller<S, M, N>
where
    S: WatermarkStore,
    M: Mailbox,
    N: Notifier,
{
    pub fn new(store: S, mailbox: M, notifier: N, display_name: impl Into<String>) -> Self {
        Self {
            store,
            mailbox,
            notifier,
            display_name: display_name.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn mailbox(&self) -> &M {
        &self.mailbox
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Load the watermark, poll, and save the advanced watermark.
    pub async fn run(&self, filter: &str) -> Result<RunReport, RunError> {
        let watermark = self.store.load().await.map_err(RunError::LoadWatermark)?;

        info!(filter = %filter, watermark = %watermark, "poll_run_starting");

        let report = self.poll(watermark, filter).await?;

        self.store
            .save(report.saved)
            .await
            .map_err(RunError::SaveWatermark)?;

        info!(
            previous = %report.previous,
            saved = %report.saved,
            listed = report.listed,
            fresh = report.fresh,
            undecodable = report.undecodable,
            notified = report.notified,
            "poll_run_complete"
        );

        Ok(report)
    }

    /// Poll once from `watermark` without touching the store.
    ///
    /// The returned report carries the watermark to persist.
    pub async fn poll(&self, watermark: Watermark, filter: &str) -> Result<RunReport, RunError> {
        let summaries = self
            .mailbox
            .list(filter, PAGE_SIZE)
            .await
            .map_err(RunError::ListMessages)?;

        let mut fetched = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let message = self
                .mailbox
                .get(&summary.id)
                .await
                .map_err(|source| RunError::FetchMessage {
                    id: summary.id.clone(),
                    source,
                })?;

            let stale = watermark.is_stale(message.delivered_at);
            fetched.push(message);

            // Newest first: everything after a stale message is older still.
            if stale {
                break;
            }
        }

        let (fresh, stale) = split_fresh(fetched, watermark);
        if let Some(first_stale) = stale.first() {
            info!(
                message_id = %first_stale.id,
                delivered_at = %first_stale.delivered_at,
                watermark = %watermark,
                "poll_reached_seen_messages"
            );
        }

        let candidate = advance_watermark(watermark, &fresh);
        let mut undecodable = 0;
        let mut notified = 0;

        for (message, outcome) in fresh.iter().zip(extract_messages(&fresh)) {
            match outcome {
                Outcome::Matched(extraction) => {
                    info!(
                        message_id = %message.id,
                        delivered_at = %message.delivered_at,
                        template = %extraction.template,
                        text = %extraction.text,
                        "poll_message_matched"
                    );

                    self.notifier
                        .post(&extraction.text, &self.display_name)
                        .await
                        .map_err(|source| RunError::Notify {
                            id: message.id.clone(),
                            source,
                        })?;
                    notified += 1;
                }
                Outcome::NoMatch => {
                    info!(
                        message_id = %message.id,
                        delivered_at = %message.delivered_at,
                        "poll_message_unmatched"
                    );
                }
                Outcome::Undecodable(e) => {
                    warn!(
                        message_id = %message.id,
                        error = %e,
                        "poll_message_undecodable"
                    );
                    undecodable += 1;
                }
            }
        }

        Ok(RunReport {
            previous: watermark,
            saved: candidate,
            listed: summaries.len(),
            fresh: fresh.len(),
            undecodable,
            notified,
        })
    }
}
