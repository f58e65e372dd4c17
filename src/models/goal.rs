use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Long-term goal shown on the calendar at its target date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub is_completed: bool,
}

impl Goal {
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.date == date
    }
}
