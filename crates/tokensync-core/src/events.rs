//! Sync events
//!
//! The engine and reconciler report what they do on a bounded channel so an
//! embedding application (or a test) can observe a run without parsing logs.
//! Deprecations are the warning side channel: every one is both logged with
//! `warn!` and sent as [`SyncEvent::AddressDeprecated`].

use tokio::sync::mpsc;
use tracing::warn;

use crate::model::{Address, ListingId};

/// Events emitted during a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    Started {
        listings: usize,
        indexed_listings: usize,
    },

    /// Listing skipped (ineligible this run)
    ListingSkipped {
        listing_id: ListingId,
        slug: String,
        reason: String,
    },

    /// Address no longer reported for its listing; record deprecated
    AddressDeprecated {
        listing_id: ListingId,
        slug: String,
        address: Address,
    },

    /// Record created or overwritten
    RecordWritten {
        listing_id: ListingId,
        address: Address,
    },

    /// Listing fully reconciled
    ListingReconciled {
        listing_id: ListingId,
        deprecated: usize,
        written: usize,
    },

    /// Indexed listing ID absent from the feed
    VanishedListing {
        listing_id: ListingId,
        addresses: usize,
    },

    /// Run finished
    Finished {
        reconciled: usize,
        skipped: usize,
    },
}

/// Non-blocking sender half of the event channel
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<SyncEvent>,
}

impl EventEmitter {
    /// Create an emitter and the receiver that observes it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Emit an event, dropping it if the channel is full or closed
    pub fn emit(&self, event: SyncEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening; events are optional.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_delivers_in_order() {
        let (emitter, mut rx) = EventEmitter::channel(4);
        emitter.emit(SyncEvent::Started { listings: 2, indexed_listings: 1 });
        emitter.emit(SyncEvent::Finished { reconciled: 2, skipped: 0 });

        assert!(matches!(rx.recv().await, Some(SyncEvent::Started { listings: 2, .. })));
        assert!(matches!(rx.recv().await, Some(SyncEvent::Finished { .. })));
    }

    #[test]
    fn test_emit_never_blocks_when_full_or_closed() {
        let (emitter, rx) = EventEmitter::channel(1);
        emitter.emit(SyncEvent::Finished { reconciled: 0, skipped: 0 });
        emitter.emit(SyncEvent::Finished { reconciled: 0, skipped: 0 });
        drop(rx);
        emitter.emit(SyncEvent::Finished { reconciled: 0, skipped: 0 });
    }
}
