use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::ActivityStore;

/// Consecutive-day activity counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
}

/// Computes current and longest streaks from activity days sorted newest first.
///
/// The current streak is zero once more than one day has passed since the
/// latest activity. Repeated days count once and never break a run.
pub fn compute_streak(days: &[NaiveDate], today: NaiveDate) -> Streak {
    Streak {
        current: current_streak(days, today),
        longest: longest_streak(days),
    }
}

fn current_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let Some(&last) = days.first() else {
        return 0;
    };
    if (today - last).num_days() > 1 {
        return 0;
    }

    let mut streak = 0;
    let mut expected = last;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        if previous == Some(day) {
            continue;
        }
        if day != expected {
            break;
        }
        streak += 1;
        previous = Some(day);
        match expected.pred_opt() {
            Some(prior) => expected = prior,
            None => break,
        }
    }

    streak
}

fn longest_streak(days: &[NaiveDate]) -> u32 {
    if days.is_empty() {
        return 0;
    }

    let mut longest = 1;
    let mut run = 1;
    for pair in days.windows(2) {
        match (pair[0] - pair[1]).num_days() {
            0 => {}
            1 => {
                run += 1;
                longest = longest.max(run);
            }
            _ => run = 1,
        }
    }

    longest
}

/// Streak queries backed by the activity store
#[derive(Clone)]
pub struct StreakService {
    activities: Arc<dyn ActivityStore>,
}

impl StreakService {
    pub fn new(activities: Arc<dyn ActivityStore>) -> Self {
        Self { activities }
    }

    pub async fn streak_for(&self, user_id: Uuid, today: NaiveDate) -> Result<Streak, DatabaseError> {
        let days: Vec<NaiveDate> = self
            .activities
            .list_desc(user_id)
            .await?
            .into_iter()
            .map(|record| record.activity_date)
            .collect();

        Ok(compute_streak(&days, today))
    }

    /// Marks `day` as studied and returns the streak as of that day.
    pub async fn record_activity(&self, user_id: Uuid, day: NaiveDate) -> Result<Streak, DatabaseError> {
        self.activities.record(user_id, day).await?;
        tracing::debug!("Recorded activity for user {} on {}", user_id, day);
        self.streak_for(user_id, day).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn three_consecutive_days() {
        assert_eq!(
            compute_streak(&[d(10), d(9), d(8)], d(10)),
            Streak { current: 3, longest: 3 }
        );
    }

    #[test]
    fn gap_after_first_day() {
        assert_eq!(compute_streak(&[d(10), d(8)], d(10)), Streak { current: 1, longest: 1 });
    }

    #[test]
    fn stale_activity_breaks_current() {
        assert_eq!(compute_streak(&[d(5)], d(10)), Streak { current: 0, longest: 1 });
    }

    #[test]
    fn yesterday_still_counts() {
        assert_eq!(compute_streak(&[d(9), d(8)], d(10)), Streak { current: 2, longest: 2 });
        assert_eq!(compute_streak(&[d(8), d(7)], d(10)).current, 0);
    }

    #[test]
    fn empty_history() {
        assert_eq!(compute_streak(&[], d(10)), Streak::default());
    }

    #[test]
    fn longest_can_be_in_the_past() {
        let days = [d(20), d(19), d(15), d(14), d(13), d(12), d(5)];
        assert_eq!(compute_streak(&days, d(20)), Streak { current: 2, longest: 4 });
    }

    #[test]
    fn duplicate_days_count_once() {
        let days = [d(10), d(10), d(9), d(9), d(8)];
        assert_eq!(compute_streak(&days, d(10)), Streak { current: 3, longest: 3 });
    }

    #[test]
    fn crosses_month_boundary() {
        let days = [
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(compute_streak(&days, today), Streak { current: 3, longest: 3 });
    }
}
