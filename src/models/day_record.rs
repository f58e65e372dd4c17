use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};
use crate::models::habit_list;

/// Mood palette offered for the daily check-in, saddest first.
pub const MOOD_EMOJIS: [&str; 5] = ["😢", "😐", "😊", "😁", "🤩"];

/// One user's journal page for one calendar day.
///
/// Logically keyed by `(user_id, date_key)`; `id` is `None` until the record
/// has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub id: Option<i64>,
    pub user_id: String,
    pub date_key: NaiveDate,
    pub emoji: String,
    pub journal_text: String,
    pub completed_habits: Vec<String>,
    pub all_habits: Vec<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct DayRecordRow {
    pub id: i64,
    pub user_id: String,
    pub date_key: NaiveDate,
    pub emoji: String,
    pub journal_text: String,
    pub completed_habits: String,
    pub all_habits: String,
}

impl TryFrom<DayRecordRow> for DayRecord {
    type Error = AppError;

    fn try_from(row: DayRecordRow) -> AppResult<Self> {
        Ok(Self {
            id: Some(row.id),
            user_id: row.user_id,
            date_key: row.date_key,
            emoji: row.emoji,
            journal_text: row.journal_text,
            completed_habits: habit_list::decode(&row.completed_habits)?,
            all_habits: habit_list::decode(&row.all_habits)?,
        })
    }
}

impl DayRecord {
    pub fn new(user_id: impl Into<String>, date_key: NaiveDate) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            date_key,
            emoji: String::new(),
            journal_text: String::new(),
            completed_habits: Vec::new(),
            all_habits: Vec::new(),
        }
    }

    pub fn with_habits(mut self, habits: Vec<String>) -> Self {
        self.all_habits = habits;
        self.normalized()
    }

    pub fn with_mood(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    pub fn with_journal(mut self, text: impl Into<String>) -> Self {
        self.journal_text = text.into();
        self
    }

    /// Appends a habit to the tracked list. Blank names and names already
    /// tracked are ignored.
    pub fn add_habit(mut self, name: &str) -> Self {
        let name = name.trim();
        if !name.is_empty() && !self.all_habits.iter().any(|h| h == name) {
            self.all_habits.push(name.to_string());
        }
        self
    }

    pub fn set_habit_done(mut self, name: &str, done: bool) -> Self {
        if done {
            let tracked = self.all_habits.iter().any(|h| h == name);
            if tracked && !self.is_habit_done(name) {
                self.completed_habits.push(name.to_string());
            }
        } else {
            self.completed_habits.retain(|h| h != name);
        }
        self
    }

    pub fn remove_habit(mut self, name: &str) -> Self {
        self.all_habits.retain(|h| h != name);
        self.completed_habits.retain(|h| h != name);
        self
    }

    pub fn is_habit_done(&self, name: &str) -> bool {
        self.completed_habits.iter().any(|h| h == name)
    }

    pub fn has_mood(&self) -> bool {
        !self.emoji.is_empty()
    }

    /// Drops completed entries that are no longer tracked.
    pub fn normalized(mut self) -> Self {
        let all = &self.all_habits;
        self.completed_habits.retain(|h| all.contains(h));
        self
    }
}

/// Parses an ISO `YYYY-MM-DD` date key.
pub fn parse_date_key(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{raw}', expected YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn record() -> DayRecord {
        DayRecord::new("maria", day()).with_habits(vec!["Read".into(), "Walk".into()])
    }

    #[test]
    fn test_add_habit_ignores_blank_and_duplicates() {
        let r = record().add_habit("  ").add_habit("Read").add_habit(" Yoga ");
        assert_eq!(r.all_habits, vec!["Read", "Walk", "Yoga"]);
    }

    #[test]
    fn test_mark_done_only_for_tracked_habits() {
        let r = record()
            .set_habit_done("Read", true)
            .set_habit_done("Read", true)
            .set_habit_done("Swim", true);
        assert_eq!(r.completed_habits, vec!["Read"]);

        let r = r.set_habit_done("Read", false);
        assert!(r.completed_habits.is_empty());
    }

    #[test]
    fn test_remove_habit_clears_both_lists() {
        let r = record().set_habit_done("Walk", true).remove_habit("Walk");
        assert_eq!(r.all_habits, vec!["Read"]);
        assert!(!r.is_habit_done("Walk"));
    }

    #[test]
    fn test_normalized_keeps_completed_a_subset() {
        let mut r = record();
        r.completed_habits = vec!["Walk".into(), "Ghost".into()];
        assert_eq!(r.normalized().completed_habits, vec!["Walk"]);
    }

    #[test]
    fn test_parse_date_key() {
        assert_eq!(parse_date_key("2026-03-14").unwrap(), day());
        assert!(matches!(parse_date_key("14/03/2026"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_date_key_serializes_as_iso() {
        let json = serde_json::to_value(record().with_mood(MOOD_EMOJIS[2])).unwrap();
        assert_eq!(json["date_key"], "2026-03-14");
        assert_eq!(json["emoji"], "😊");
    }
}
