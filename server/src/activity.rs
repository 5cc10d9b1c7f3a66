//! Activity Coalescer
//!
//! "Last seen" events arrive with every message. Per identity, at most one
//! durable write is made per window; marks inside the window are dropped.
//!
//! The slot is reserved in the map before the write, so concurrent marks for
//! one identity produce a single write. A failed write hands the slot back.
//!
//! The per-day counter counts flushed windows, not messages.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::db::{ActivityRow, DailyActivityRow, Gateway, GatewayError};

/// Whether a mark at `now` needs a durable write.
#[must_use]
pub fn should_flush(last_flush: Option<Instant>, now: Instant, window: Duration) -> bool {
    last_flush.is_none_or(|last| now.saturating_duration_since(last) >= window)
}

pub struct ActivityCoalescer {
    gateway: Gateway,
    marks: DashMap<i64, Instant>,
    window: Duration,
}

impl ActivityCoalescer {
    #[must_use]
    pub fn new(gateway: Gateway, window: Duration) -> Self {
        Self {
            gateway,
            marks: DashMap::new(),
            window,
        }
    }

    /// Record activity. Returns `true` when a durable write was made.
    pub async fn mark_active(&self, identity_id: i64) -> Result<bool, GatewayError> {
        let now = Instant::now();

        // The entry guard must be released before awaiting.
        let previous = match self.marks.entry(identity_id) {
            Entry::Occupied(mut slot) => {
                if !should_flush(Some(*slot.get()), now, self.window) {
                    return Ok(false);
                }
                Some(slot.insert(now))
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                None
            }
        };

        match self.flush(identity_id, Utc::now()).await {
            Ok(()) => {
                debug!(identity_id, "Activity flushed");
                Ok(true)
            }
            Err(e) => {
                self.release(identity_id, now, previous);
                warn!(identity_id, error = %e, "Activity flush failed");
                Err(e)
            }
        }
    }

    /// Undo a reservation made at `reserved`, unless a later mark replaced it.
    fn release(&self, identity_id: i64, reserved: Instant, previous: Option<Instant>) {
        match previous {
            Some(prev) => {
                if let Some(mut slot) = self.marks.get_mut(&identity_id) {
                    if *slot == reserved {
                        *slot = prev;
                    }
                }
            }
            None => {
                self.marks.remove_if(&identity_id, |_, t| *t == reserved);
            }
        }
    }

    /// Durable write for a mark taken at `seen_at`.
    ///
    /// The day counter only moves when `last_seen_at` advances, so a retried
    /// statement that already committed is a no-op.
    pub(crate) async fn flush(
        &self,
        identity_id: i64,
        seen_at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        self.gateway
            .run("activity_flush", |pool| async move {
                sqlx::query(
                    r"
                    WITH seen AS (
                        INSERT INTO identity_activity (identity_id, last_seen_at)
                        VALUES ($1, $2)
                        ON CONFLICT (identity_id) DO UPDATE SET last_seen_at = EXCLUDED.last_seen_at
                        WHERE identity_activity.last_seen_at < EXCLUDED.last_seen_at
                        RETURNING identity_id
                    )
                    INSERT INTO daily_activity (identity_id, day, active_windows)
                    SELECT identity_id, ($2 AT TIME ZONE 'UTC')::date, 1 FROM seen
                    ON CONFLICT (identity_id, day)
                    DO UPDATE SET active_windows = daily_activity.active_windows + 1
                    ",
                )
                .bind(identity_id)
                .bind(seen_at)
                .execute(&pool)
                .await
            })
            .await?;
        Ok(())
    }

    /// Drop marks older than the window. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.marks.len();
        self.marks
            .retain(|_, last| now.saturating_duration_since(*last) < self.window);
        before.saturating_sub(self.marks.len())
    }

    /// Number of identities currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.marks.len()
    }

    /// Durable activity summary and per-day counters, most recent day first.
    pub async fn summary(
        &self,
        identity_id: i64,
    ) -> Result<(Option<ActivityRow>, Vec<DailyActivityRow>), GatewayError> {
        let seen = self
            .gateway
            .run("activity_seen", |pool| async move {
                sqlx::query_as::<_, ActivityRow>(
                    "SELECT identity_id, first_seen_at, last_seen_at FROM identity_activity WHERE identity_id = $1",
                )
                .bind(identity_id)
                .fetch_optional(&pool)
                .await
            })
            .await?;

        let days = self
            .gateway
            .run("activity_days", |pool| async move {
                sqlx::query_as::<_, DailyActivityRow>(
                    r"
                    SELECT identity_id, day, active_windows
                    FROM daily_activity
                    WHERE identity_id = $1
                    ORDER BY day DESC
                    LIMIT 30
                    ",
                )
                .bind(identity_id)
                .fetch_all(&pool)
                .await
            })
            .await?;

        Ok((seen, days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::unreachable_gateway;

    const WINDOW: Duration = Duration::from_secs(300);

    #[test]
    fn test_first_mark_flushes() {
        assert!(should_flush(None, Instant::now(), WINDOW));
    }

    #[test]
    fn test_mark_inside_window_is_dropped() {
        let last = Instant::now();
        assert!(!should_flush(Some(last), last + Duration::from_secs(299), WINDOW));
        assert!(should_flush(Some(last), last + WINDOW, WINDOW));
    }

    #[test]
    fn test_clock_going_backwards_does_not_flush() {
        let now = Instant::now();
        let later = now + Duration::from_secs(10);
        assert!(!should_flush(Some(later), now, WINDOW));
    }

    #[tokio::test]
    async fn test_failed_flush_releases_reservation() {
        let coalescer = ActivityCoalescer::new(unreachable_gateway(), WINDOW);

        assert!(coalescer.mark_active(7).await.is_err());
        assert_eq!(coalescer.tracked(), 0);

        // The next event tries again instead of being coalesced away.
        assert!(coalescer.mark_active(7).await.is_err());
    }

    #[tokio::test]
    async fn test_prune_drops_stale_marks() {
        let coalescer = ActivityCoalescer::new(unreachable_gateway(), Duration::from_millis(1));
        coalescer.marks.insert(1, Instant::now());
        coalescer.marks.insert(2, Instant::now());
        tokio::time::sleep(Duration::from_millis(5)).await;
        coalescer.marks.insert(3, Instant::now() + Duration::from_secs(60));

        assert_eq!(coalescer.prune(), 2);
        assert_eq!(coalescer.tracked(), 1);
    }
}
