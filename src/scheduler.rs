use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;

use crate::{
    broadcast::{BroadcastOutcome, Broadcaster},
    database::connection::SubscriberStore,
    quote::QuoteSource,
    transport::Messenger,
};

/// Next time the schedule fires strictly after `now`, read in `offset`.
pub fn next_fire(
    schedule: &Schedule,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Option<DateTime<FixedOffset>> {
    schedule.after(&now.with_timezone(&offset)).next()
}

/// Fire time to wait for next. Starting from the last fired instant when the
/// wall clock reads earlier than it, so one instant never fires twice.
pub fn following_fire(
    schedule: &Schedule,
    offset: FixedOffset,
    now: DateTime<Utc>,
    last_fired: Option<DateTime<Utc>>,
) -> Option<DateTime<FixedOffset>> {
    let from = last_fired.map_or(now, |fired| fired.max(now));
    next_fire(schedule, offset, from)
}

/// Delivery time shown to new subscribers, e.g. `8:00 AM (UTC+05:30)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTime(String);

impl DeliveryTime {
    pub fn new(schedule: &Schedule, offset: FixedOffset, now: DateTime<Utc>) -> Self {
        let label = next_fire(schedule, offset, now)
            .map(|next| format!("{} (UTC{offset})", next.format("%-I:%M %p")))
            .unwrap_or_else(|| "the scheduled time".to_owned());
        Self(label)
    }
}

impl fmt::Display for DeliveryTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Triggers a broadcast every time the schedule fires. Never returns unless
/// the schedule runs out of fire times.
pub async fn run<S, M, Q>(broadcaster: Arc<Broadcaster<S, M, Q>>, schedule: Schedule, offset: FixedOffset)
where
    S: SubscriberStore,
    M: Messenger,
    Q: QuoteSource,
{
    let mut last_fired = None;
    loop {
        let now = Utc::now();
        let Some(next) = following_fire(&schedule, offset, now, last_fired) else {
            tracing::warn!("Broadcast schedule has no upcoming fire time, scheduler stopped");
            return;
        };

        let wait = (next.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        tracing::info!("Next broadcast at {next}");
        tokio::time::sleep(wait).await;
        last_fired = Some(next.with_timezone(&Utc));

        if let BroadcastOutcome::Skipped = broadcaster.run().await {
            tracing::warn!("Scheduled broadcast at {next} was skipped");
        }
    }
}
