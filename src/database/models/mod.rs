pub mod activity;
pub mod review_card;
pub mod user;

pub use activity::ActivityRecord;
pub use review_card::ReviewCard;
pub use user::User;
