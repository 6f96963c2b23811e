pub mod reactivation_service;
pub mod streak_service;

pub use reactivation_service::{reactivate_due_cards, PassOutcome, ReactivationScheduler};
pub use streak_service::{compute_streak, Streak, StreakService};
