use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per user per calendar day on which the user studied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
