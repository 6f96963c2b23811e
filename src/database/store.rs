use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::UserIdentity;
use crate::database::manager::DatabaseError;
use crate::database::models::{ActivityRecord, ReviewCard, User};

/// Resolves a verified identity to a local user, creating it on first sight
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_or_create(&self, identity: &UserIdentity) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// All activity rows for the user, newest day first
    async fn list_desc(&self, user_id: Uuid) -> Result<Vec<ActivityRecord>, DatabaseError>;

    /// Records activity for `day`. Recording the same day twice is a no-op.
    async fn record(&self, user_id: Uuid, day: NaiveDate) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ReviewCardStore: Send + Sync {
    async fn find_dormant(&self) -> Result<Vec<ReviewCard>, DatabaseError>;

    /// Flips a card back into study rotation
    async fn activate(&self, card_id: Uuid) -> Result<(), DatabaseError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_or_create(&self, identity: &UserIdentity) -> Result<User, DatabaseError> {
        // Profile fields follow the provider on every sign-in
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, clerk_id, email, first_name, last_name, created_at)
             VALUES ($1, $2, $3, $4, $5, now())
             ON CONFLICT (clerk_id) DO UPDATE
                SET email = COALESCE(EXCLUDED.email, users.email),
                    first_name = COALESCE(EXCLUDED.first_name, users.first_name),
                    last_name = COALESCE(EXCLUDED.last_name, users.last_name)
             RETURNING id, clerk_id, email, first_name, last_name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&identity.subject)
        .bind(&identity.email)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}

pub struct PgActivityStore {
    pool: PgPool,
}

impl PgActivityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for PgActivityStore {
    async fn list_desc(&self, user_id: Uuid) -> Result<Vec<ActivityRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, ActivityRecord>(
            "SELECT id, user_id, activity_date, created_at
             FROM activities
             WHERE user_id = $1
             ORDER BY activity_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn record(&self, user_id: Uuid, day: NaiveDate) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO activities (id, user_id, activity_date, created_at)
             VALUES ($1, $2, $3, now())
             ON CONFLICT (user_id, activity_date) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(day)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct PgReviewCardStore {
    pool: PgPool,
}

impl PgReviewCardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewCardStore for PgReviewCardStore {
    async fn find_dormant(&self) -> Result<Vec<ReviewCard>, DatabaseError> {
        let cards = sqlx::query_as::<_, ReviewCard>(
            "SELECT id, user_id, question, active, cycle_days, last_updated
             FROM review_cards
             WHERE active = false",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn activate(&self, card_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE review_cards SET active = true WHERE id = $1")
            .bind(card_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("review card {}", card_id)));
        }
        Ok(())
    }
}
