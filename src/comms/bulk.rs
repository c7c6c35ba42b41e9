//! Bulk dispatch of one message to many recipients, strictly in input order,
//! with a fixed pause between sends.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{Instrument, info, info_span};

use super::channel::Channel;
use super::dispatcher::{ChannelDispatcher, Recipient};
use crate::config::CommsConfig;

/// Final tally of a bulk dispatch. `sent + failed` equals the recipient count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkDispatchResult {
    pub sent: usize,
    pub failed: usize,
}

/// Sequential, paced sender on top of a [`ChannelDispatcher`].
///
/// Not idempotent: re-running a batch re-sends every message. Callers that
/// retry after a partial failure must track which recipients already succeeded.
pub struct BulkDispatcher {
    dispatcher: Arc<ChannelDispatcher>,
    pacing: Duration,
}

impl BulkDispatcher {
    pub fn new(dispatcher: Arc<ChannelDispatcher>, config: &CommsConfig) -> Self {
        Self {
            dispatcher,
            pacing: config.pacing,
        }
    }

    pub fn dispatcher(&self) -> &ChannelDispatcher {
        &self.dispatcher
    }

    /// Send `message` to every recipient in order, pausing between sends.
    ///
    /// A failed recipient is counted and skipped; it never stops the batch.
    pub async fn send_bulk(
        &self,
        recipients: &[Recipient],
        message: &str,
        channel: Channel,
    ) -> BulkDispatchResult {
        let span = info_span!("bulk_dispatch", %channel, recipients = recipients.len());
        async {
            let mut result = BulkDispatchResult::default();

            for (i, recipient) in recipients.iter().enumerate() {
                if i > 0 && !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }

                let record = self.dispatcher.send(channel, recipient, message).await;
                if record.is_success() {
                    result.sent += 1;
                } else {
                    result.failed += 1;
                }
            }

            info!(sent = result.sent, failed = result.failed, "Bulk dispatch complete");
            result
        }
        .instrument(span)
        .await
    }
}
