use std::collections::{BTreeMap, BTreeSet};

const SECONDS_PER_DAY: i64 = 86_400;

/// Counters derived from a submission calendar, keyed by the UTC-midnight
/// epoch second of each day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivitySummary {
    pub total_submissions: u32,
    pub active_days: u32,
    pub max_streak: u32,
    pub current_streak: u32,
}

impl ActivitySummary {
    /// `today` is a day index (epoch seconds / 86400). A current streak is
    /// still alive if the last active day is today or yesterday.
    pub fn from_calendar(calendar: &BTreeMap<String, u32>, today: i64) -> Self {
        let mut total_submissions: u32 = 0;
        let mut days = BTreeSet::new();

        for (key, count) in calendar {
            let Ok(epoch) = key.trim().parse::<i64>() else {
                continue;
            };
            total_submissions = total_submissions.saturating_add(*count);
            if *count > 0 {
                days.insert(epoch.div_euclid(SECONDS_PER_DAY));
            }
        }

        let mut max_streak = 0;
        let mut run = 0;
        let mut previous: Option<i64> = None;
        for day in &days {
            run = match previous {
                Some(p) if p + 1 == *day => run + 1,
                _ => 1,
            };
            max_streak = max_streak.max(run);
            previous = Some(*day);
        }

        let mut current_streak = 0;
        let start = if days.contains(&today) {
            Some(today)
        } else if days.contains(&(today - 1)) {
            Some(today - 1)
        } else {
            None
        };
        if let Some(mut day) = start {
            while days.contains(&day) {
                current_streak += 1;
                day -= 1;
            }
        }

        Self {
            total_submissions,
            active_days: days.len() as u32,
            max_streak,
            current_streak,
        }
    }
}

pub fn day_index(epoch_millis: i64) -> i64 {
    epoch_millis.div_euclid(1000 * SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar(entries: &[(i64, u32)]) -> BTreeMap<String, u32> {
        entries
            .iter()
            .map(|(day, count)| ((day * SECONDS_PER_DAY).to_string(), *count))
            .collect()
    }

    #[test]
    fn test_empty_calendar() {
        let summary = ActivitySummary::from_calendar(&BTreeMap::new(), 20_000);
        assert_eq!(summary, ActivitySummary::default());
    }

    #[test]
    fn test_counts_and_streaks() {
        let cal = calendar(&[(100, 2), (101, 1), (102, 4), (105, 1), (106, 3)]);
        let summary = ActivitySummary::from_calendar(&cal, 106);
        assert_eq!(summary.total_submissions, 11);
        assert_eq!(summary.active_days, 5);
        assert_eq!(summary.max_streak, 3);
        assert_eq!(summary.current_streak, 2);
    }

    #[test]
    fn test_current_streak_survives_until_end_of_next_day() {
        let cal = calendar(&[(10, 1), (11, 1)]);
        assert_eq!(ActivitySummary::from_calendar(&cal, 12).current_streak, 2);
        assert_eq!(ActivitySummary::from_calendar(&cal, 13).current_streak, 0);
    }

    #[test]
    fn test_zero_count_days_and_bad_keys_are_not_active() {
        let mut cal = calendar(&[(50, 0), (51, 2)]);
        cal.insert("not-a-day".to_string(), 9);
        let summary = ActivitySummary::from_calendar(&cal, 51);
        assert_eq!(summary.total_submissions, 2);
        assert_eq!(summary.active_days, 1);
        assert_eq!(summary.max_streak, 1);
        assert_eq!(summary.current_streak, 1);
    }

    #[test]
    fn test_day_index_from_millis() {
        assert_eq!(day_index(0), 0);
        assert_eq!(day_index(86_400_000 * 3 + 5), 3);
    }
}
