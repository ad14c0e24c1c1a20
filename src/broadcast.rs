use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tracing::instrument;

use crate::{
    database::connection::SubscriberStore,
    error::SendError,
    keyboard::Keyboard,
    quote::QuoteSource,
    transport::Messenger,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub deactivated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Completed(BroadcastReport),
    /// The active subscribers couldn't be listed; nothing was sent.
    Aborted,
    /// Another run was still in flight.
    Skipped,
}

/// Clears the in-flight flag when a run ends, including when its future is
/// dropped mid-broadcast or unwinds.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends one quote to every active subscriber, one at a time, pausing
/// `pacing` after each attempt.
pub struct Broadcaster<S, M, Q> {
    store: Arc<S>,
    messenger: M,
    quotes: Arc<Q>,
    pacing: Duration,
    in_flight: AtomicBool,
}

impl<S, M, Q> Broadcaster<S, M, Q>
where
    S: SubscriberStore,
    M: Messenger,
    Q: QuoteSource,
{
    pub fn new(store: Arc<S>, messenger: M, quotes: Arc<Q>, pacing: Duration) -> Self {
        Self {
            store,
            messenger,
            quotes,
            pacing,
            in_flight: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_default_pacing(store: Arc<S>, messenger: M, quotes: Arc<Q>) -> Self {
        Self::new(store, messenger, quotes, Duration::from_millis(crate::config::DEFAULT_PACING_MS))
    }

    #[instrument(level = "info", skip(self))]
    pub async fn run(&self) -> BroadcastOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Broadcast already in progress, skipping this trigger");
            return BroadcastOutcome::Skipped;
        }

        let _in_flight = InFlight(&self.in_flight);
        self.broadcast().await
    }

    async fn broadcast(&self) -> BroadcastOutcome {
        tracing::info!("Starting broadcast...");

        let quote = self.quotes.fetch_quote().await;

        let subscribers = match self.store.active_subscribers().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                tracing::error!("Error fetching subscribers: {e}");
                return BroadcastOutcome::Aborted;
            }
        };

        let mut report = BroadcastReport::default();
        for chat_id in subscribers {
            report.attempted += 1;
            let result = self.messenger.send_text(chat_id, &quote, Keyboard::Keep).await;
            tokio::time::sleep(self.pacing).await;

            match result {
                Ok(()) => report.delivered += 1,
                Err(SendError::Blocked(reason)) => {
                    tracing::info!("User {} blocked the bot ({reason}). Deactivating...", chat_id.0);
                    match self.store.set_active(chat_id, false).await {
                        Ok(()) => report.deactivated += 1,
                        Err(e) => {
                            tracing::error!("Failed to deactivate {}: {e}", chat_id.0);
                            report.failed += 1;
                        }
                    }
                }
                Err(SendError::Other(e)) => {
                    tracing::error!("Failed to send to {}: {e}", chat_id.0);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            deactivated = report.deactivated,
            failed = report.failed,
            "Broadcast complete."
        );
        BroadcastOutcome::Completed(report)
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::ChatId;
    use tokio::time::Instant;

    use super::*;
    use crate::testing::{FakeStore, FixedQuote, RecordingMessenger, StoreCall};

    fn broadcaster(
        store: FakeStore,
        messenger: RecordingMessenger,
    ) -> Broadcaster<FakeStore, RecordingMessenger, FixedQuote> {
        Broadcaster::with_default_pacing(Arc::new(store), messenger, Arc::new(FixedQuote("Q")))
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_recipient_is_deactivated_and_others_still_receive() {
        let messenger = RecordingMessenger {
            blocked: [ChatId(2)].into_iter().collect(),
            ..RecordingMessenger::default()
        };
        let broadcaster = broadcaster(FakeStore::with_active(&[1, 2, 3]), messenger);
        let started = Instant::now();

        let outcome = broadcaster.run().await;

        assert_eq!(
            outcome,
            BroadcastOutcome::Completed(BroadcastReport {
                attempted: 3,
                delivered: 2,
                deactivated: 1,
                failed: 0,
            })
        );

        let sent = broadcaster.messenger.sent();
        let recipients: Vec<ChatId> = sent.iter().map(|s| s.chat_id).collect();
        assert_eq!(recipients, vec![ChatId(1), ChatId(2), ChatId(3)]);
        assert!(sent.iter().all(|s| s.text == "Q"));

        assert_eq!(
            broadcaster.store.calls(),
            vec![StoreCall::QueryActive, StoreCall::SetActive(ChatId(2), false)]
        );
        assert_eq!(started.elapsed(), Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_follows_every_attempt_in_order() {
        let messenger = RecordingMessenger {
            broken: [ChatId(1)].into_iter().collect(),
            ..RecordingMessenger::default()
        };
        let broadcaster = broadcaster(FakeStore::with_active(&[1, 2, 3, 4]), messenger);
        let started = Instant::now();

        broadcaster.run().await;

        let offsets: Vec<Duration> = broadcaster
            .messenger
            .sent()
            .iter()
            .map(|s| s.at - started)
            .collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(150),
            ]
        );
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn other_send_errors_skip_without_deactivation() {
        let messenger = RecordingMessenger {
            broken: [ChatId(1)].into_iter().collect(),
            ..RecordingMessenger::default()
        };
        let broadcaster = broadcaster(FakeStore::with_active(&[1, 2]), messenger);

        let outcome = broadcaster.run().await;

        assert_eq!(
            outcome,
            BroadcastOutcome::Completed(BroadcastReport {
                attempted: 2,
                delivered: 1,
                deactivated: 0,
                failed: 1,
            })
        );
        assert_eq!(broadcaster.store.calls(), vec![StoreCall::QueryActive]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_deactivation_does_not_stop_the_run() {
        let store = FakeStore {
            fail_set_active: true,
            ..FakeStore::with_active(&[1, 2])
        };
        let messenger = RecordingMessenger {
            blocked: [ChatId(1)].into_iter().collect(),
            ..RecordingMessenger::default()
        };
        let broadcaster = broadcaster(store, messenger);

        broadcaster.run().await;

        assert_eq!(broadcaster.messenger.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn query_failure_aborts_without_sending() {
        let store = FakeStore {
            fail_query: true,
            ..FakeStore::with_active(&[1, 2])
        };
        let broadcaster = broadcaster(store, RecordingMessenger::default());

        assert_eq!(broadcaster.run().await, BroadcastOutcome::Aborted);
        assert!(broadcaster.messenger.sent().is_empty());
        assert_eq!(broadcaster.store.calls(), vec![StoreCall::QueryActive]);
    }

    #[tokio::test(start_paused = true)]
    async fn running_twice_sends_twice() {
        let broadcaster = broadcaster(FakeStore::with_active(&[1]), RecordingMessenger::default());

        broadcaster.run().await;
        broadcaster.run().await;

        assert_eq!(broadcaster.messenger.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_run_is_skipped() {
        let broadcaster = broadcaster(FakeStore::with_active(&[1, 2]), RecordingMessenger::default());

        let (first, second) = tokio::join!(broadcaster.run(), broadcaster.run());

        assert!(matches!(first, BroadcastOutcome::Completed(_)));
        assert_eq!(second, BroadcastOutcome::Skipped);
        assert_eq!(broadcaster.messenger.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_does_not_block_the_next() {
        let broadcaster = broadcaster(FakeStore::with_active(&[1, 2, 3]), RecordingMessenger::default());

        let cancelled = tokio::time::timeout(Duration::from_millis(10), broadcaster.run()).await;
        assert!(cancelled.is_err());

        assert!(matches!(broadcaster.run().await, BroadcastOutcome::Completed(_)));
        assert_eq!(broadcaster.messenger.sent().len(), 4);
    }
}
