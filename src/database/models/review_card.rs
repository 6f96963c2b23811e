use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Spaced-repetition card. `active = false` means dormant since `last_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReviewCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub active: bool,
    pub cycle_days: i32,
    pub last_updated: DateTime<Utc>,
}

impl ReviewCard {
    /// Whole days elapsed since the card last changed state, rounded down.
    pub fn days_dormant(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_days()
    }

    /// A dormant card is due once its cycle has fully elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.active && self.days_dormant(now) >= i64::from(self.cycle_days)
    }
}
