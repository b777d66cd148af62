use chrono::NaiveDate;

use crate::time::ReminderTime;

/// A tracked habit. `reminder_time` is `None` for habits the owner chose
/// not to be reminded about; the dispatcher never sees those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Habit {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub frequency: String,
    pub reminder_time: Option<ReminderTime>,
    pub done_count: u32,
    pub skip_count: u32,
    pub created_at: NaiveDate,
}

impl Habit {
    /// Share of recorded outcomes that were completions, as a whole
    /// percentage. A habit with no outcomes yet reports zero.
    pub fn success_percent(&self) -> u32 {
        let total = self.done_count + self.skip_count;
        if total == 0 {
            return 0;
        }
        self.done_count * 100 / total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skip,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Done => "DONE",
            Outcome::Skip => "SKIPPED",
        }
    }
}

/// Per-user settings row. `utc_offset_hours` falls back to the default
/// until the user confirms their timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreference {
    pub user_id: i64,
    pub sheet_ref: Option<String>,
    pub utc_offset_hours: i32,
    pub timezone_confirmed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit(done: u32, skip: u32) -> Habit {
        Habit {
            id: 1,
            owner_id: 10,
            name: "read".into(),
            frequency: "Every day".into(),
            reminder_time: None,
            done_count: done,
            skip_count: skip,
            created_at: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }
    }

    #[test]
    fn success_percent_rounds_down() {
        assert_eq!(habit(1, 2).success_percent(), 33);
        assert_eq!(habit(2, 1).success_percent(), 66);
        assert_eq!(habit(5, 0).success_percent(), 100);
        assert_eq!(habit(0, 5).success_percent(), 0);
    }

    #[test]
    fn success_percent_empty_is_zero() {
        assert_eq!(habit(0, 0).success_percent(), 0);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(Outcome::Done.label(), "DONE");
        assert_eq!(Outcome::Skip.label(), "SKIPPED");
    }
}
