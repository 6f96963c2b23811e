//! In-process store implementations for tests and local development.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::UserIdentity;
use crate::database::manager::DatabaseError;
use crate::database::models::{ActivityRecord, ReviewCard, User};
use crate::database::store::{ActivityStore, ReviewCardStore, UserStore};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_or_create(&self, identity: &UserIdentity) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        let user = users.entry(identity.subject.clone()).or_insert_with(|| User {
            id: Uuid::new_v4(),
            clerk_id: identity.subject.clone(),
            email: None,
            first_name: None,
            last_name: None,
            created_at: Utc::now(),
        });

        if identity.email.is_some() {
            user.email = identity.email.clone();
        }
        if identity.first_name.is_some() {
            user.first_name = identity.first_name.clone();
        }
        if identity.last_name.is_some() {
            user.last_name = identity.last_name.clone();
        }

        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct MemoryActivityStore {
    days: RwLock<HashMap<Uuid, BTreeSet<NaiveDate>>>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn list_desc(&self, user_id: Uuid) -> Result<Vec<ActivityRecord>, DatabaseError> {
        let days = self.days.read().await;
        let records = days
            .get(&user_id)
            .map(|set| {
                set.iter()
                    .rev()
                    .map(|day| ActivityRecord {
                        id: Uuid::new_v4(),
                        user_id,
                        activity_date: *day,
                        created_at: Utc::now(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(records)
    }

    async fn record(&self, user_id: Uuid, day: NaiveDate) -> Result<(), DatabaseError> {
        self.days.write().await.entry(user_id).or_default().insert(day);
        Ok(())
    }
}

/// Card store that can be told to fail writes for specific cards
#[derive(Default)]
pub struct MemoryReviewCardStore {
    cards: RwLock<HashMap<Uuid, ReviewCard>>,
    failing: RwLock<HashSet<Uuid>>,
}

impl MemoryReviewCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, card: ReviewCard) {
        self.cards.write().await.insert(card.id, card);
    }

    pub async fn get(&self, card_id: Uuid) -> Option<ReviewCard> {
        self.cards.read().await.get(&card_id).cloned()
    }

    /// Makes every later `activate` call for this card fail.
    pub async fn fail_writes_for(&self, card_id: Uuid) {
        self.failing.write().await.insert(card_id);
    }
}

#[async_trait]
impl ReviewCardStore for MemoryReviewCardStore {
    async fn find_dormant(&self) -> Result<Vec<ReviewCard>, DatabaseError> {
        let mut dormant: Vec<ReviewCard> = self
            .cards
            .read()
            .await
            .values()
            .filter(|card| !card.active)
            .cloned()
            .collect();
        dormant.sort_by_key(|card| card.last_updated);
        Ok(dormant)
    }

    async fn activate(&self, card_id: Uuid) -> Result<(), DatabaseError> {
        if self.failing.read().await.contains(&card_id) {
            return Err(DatabaseError::QueryError(format!("write rejected for card {}", card_id)));
        }

        let mut cards = self.cards.write().await;
        let card = cards
            .get_mut(&card_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("review card {}", card_id)))?;
        card.active = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn activity_is_unique_per_day_and_newest_first() {
        let store = MemoryActivityStore::new();
        let user = Uuid::new_v4();
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();

        store.record(user, d(8)).await.unwrap();
        store.record(user, d(10)).await.unwrap();
        store.record(user, d(10)).await.unwrap();
        store.record(user, d(9)).await.unwrap();

        let days: Vec<NaiveDate> = store.list_desc(user).await.unwrap().iter().map(|r| r.activity_date).collect();
        assert_eq!(days, vec![d(10), d(9), d(8)]);
        assert!(store.list_desc(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_or_create_is_stable_per_subject() {
        let store = MemoryUserStore::new();
        let identity = UserIdentity {
            subject: "user_1".to_string(),
            email: Some("a@example.com".to_string()),
            first_name: None,
            last_name: None,
        };

        let first = store.find_or_create(&identity).await.unwrap();
        let again = store
            .find_or_create(&UserIdentity {
                first_name: Some("Ada".to_string()),
                ..identity.clone()
            })
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.first_name.as_deref(), Some("Ada"));
        assert_eq!(again.email.as_deref(), Some("a@example.com"));
        assert_eq!(store.len().await, 1);
    }
}
