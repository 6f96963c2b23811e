use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::database::manager::DatabaseError;
use crate::database::models::ReviewCard;
use crate::database::store::ReviewCardStore;

/// Reactivates every dormant card whose cycle has elapsed, one write per card.
///
/// The first failed write aborts the pass; cards activated before it stay active.
pub async fn reactivate_due_cards(
    store: &dyn ReviewCardStore,
    dormant: &[ReviewCard],
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let mut reactivated = 0;

    for card in dormant.iter().filter(|card| card.is_due(now)) {
        store.activate(card.id).await?;
        debug!(
            "Reactivated card {} after {} day(s) (cycle {})",
            card.id,
            card.days_dormant(now),
            card.cycle_days
        );
        reactivated += 1;
    }

    Ok(reactivated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed { scanned: usize, reactivated: usize },
    /// Another pass was still running
    Skipped,
}

/// Periodic driver for [`reactivate_due_cards`] that never runs two passes at once
pub struct ReactivationScheduler {
    store: Arc<dyn ReviewCardStore>,
    running: AtomicBool,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ReactivationScheduler {
    pub fn new(store: Arc<dyn ReviewCardStore>) -> Self {
        Self {
            store,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<PassOutcome, DatabaseError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Reactivation pass already in progress, skipping");
            return Ok(PassOutcome::Skipped);
        }
        let _guard = RunningGuard(&self.running);

        let dormant = self.store.find_dormant().await?;
        let reactivated = reactivate_due_cards(self.store.as_ref(), &dormant, now).await?;

        info!(
            "Reactivation pass complete: {} dormant card(s) scanned, {} reactivated",
            dormant.len(),
            reactivated
        );
        Ok(PassOutcome::Completed {
            scanned: dormant.len(),
            reactivated,
        })
    }

    /// Runs a pass every `interval`. A failed pass is logged; the next tick retries.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once(Utc::now()).await {
                    error!("Reactivation pass failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryReviewCardStore;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn dormant(cycle_days: i32, age: ChronoDuration, now: DateTime<Utc>) -> ReviewCard {
        ReviewCard {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            question: "Binary search: state the loop invariant".to_string(),
            active: false,
            cycle_days,
            last_updated: now - age,
        }
    }

    #[tokio::test]
    async fn reactivates_only_due_cards() {
        let now = Utc::now();
        let store = MemoryReviewCardStore::new();
        let due = dormant(7, ChronoDuration::days(7), now);
        let not_due = dormant(7, ChronoDuration::days(6), now);
        store.insert(due.clone()).await;
        store.insert(not_due.clone()).await;

        let count = reactivate_due_cards(&store, &[due.clone(), not_due.clone()], now).await.unwrap();

        assert_eq!(count, 1);
        assert!(store.get(due.id).await.unwrap().active);
        assert!(!store.get(not_due.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn first_write_failure_aborts_pass() {
        let now = Utc::now();
        let store = MemoryReviewCardStore::new();
        let first = dormant(1, ChronoDuration::days(3), now);
        let broken = dormant(1, ChronoDuration::days(2), now);
        let last = dormant(1, ChronoDuration::days(1), now);
        for card in [&first, &broken, &last] {
            store.insert(card.clone()).await;
        }
        store.fail_writes_for(broken.id).await;

        let result = reactivate_due_cards(&store, &[first.clone(), broken.clone(), last.clone()], now).await;

        assert!(result.is_err());
        assert!(store.get(first.id).await.unwrap().active);
        assert!(!store.get(last.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn run_once_scans_store_and_releases_guard() {
        let now = Utc::now();
        let store = Arc::new(MemoryReviewCardStore::new());
        store.insert(dormant(3, ChronoDuration::days(4), now)).await;
        store.insert(dormant(3, ChronoDuration::days(1), now)).await;

        let scheduler = ReactivationScheduler::new(store.clone());
        assert_eq!(
            scheduler.run_once(now).await.unwrap(),
            PassOutcome::Completed { scanned: 2, reactivated: 1 }
        );
        assert!(!scheduler.is_running());

        // Second pass only sees the card that is still dormant
        assert_eq!(
            scheduler.run_once(now).await.unwrap(),
            PassOutcome::Completed { scanned: 1, reactivated: 0 }
        );
    }
}
