pub mod manager;
pub mod memory;
pub mod models;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::{MemoryActivityStore, MemoryReviewCardStore, MemoryUserStore};
pub use models::{ActivityRecord, ReviewCard, User};
pub use store::{ActivityStore, PgActivityStore, PgReviewCardStore, PgUserStore, ReviewCardStore, UserStore};
