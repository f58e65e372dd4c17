//! Month grid and day detail for the calendar screen.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{DayRecord, Goal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub emoji: Option<String>,
    pub has_record: bool,
    pub has_goal: bool,
}

/// One month laid out Monday first. `leading_blanks` empty cells precede
/// the 1st.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// What tapping a day shows: the journal page if there is one, and the
/// goals due that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayDetail {
    pub date: NaiveDate,
    pub record: Option<DayRecord>,
    pub goals: Vec<Goal>,
}

pub fn index_by_date(records: &[DayRecord]) -> HashMap<NaiveDate, &DayRecord> {
    records.iter().map(|r| (r.date_key, r)).collect()
}

pub fn month_view(year: i32, month: u32, records: &[DayRecord], goals: &[Goal]) -> AppResult<MonthView> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Validation(format!("Invalid month {year}-{month:02}")))?;

    let by_date = index_by_date(records);
    let days = first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|date| {
            let record = by_date.get(&date);
            CalendarDay {
                date,
                emoji: record.filter(|r| r.has_mood()).map(|r| r.emoji.clone()),
                has_record: record.is_some(),
                has_goal: goals.iter().any(|g| g.is_due_on(date)),
            }
        })
        .collect();

    Ok(MonthView {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_monday(),
        days,
    })
}

pub fn day_detail(date: NaiveDate, records: &[DayRecord], goals: &[Goal]) -> DayDetail {
    DayDetail {
        date,
        record: records.iter().find(|r| r.date_key == date).cloned(),
        goals: goals.iter().filter(|g| g.is_due_on(date)).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal(id: i64, on: NaiveDate) -> Goal {
        Goal {
            id,
            user_id: "maria".into(),
            title: format!("Goal {id}"),
            date: on,
            is_completed: false,
        }
    }

    #[test]
    fn test_month_layout() {
        // 1 June 2026 is a Monday, 1 February 2026 a Sunday.
        let june = month_view(2026, 6, &[], &[]).unwrap();
        assert_eq!(june.leading_blanks, 0);
        assert_eq!(june.days.len(), 30);

        let feb = month_view(2026, 2, &[], &[]).unwrap();
        assert_eq!(feb.leading_blanks, 6);
        assert_eq!(feb.days.len(), 28);

        assert_eq!(month_view(2028, 2, &[], &[]).unwrap().days.len(), 29);
    }

    #[test]
    fn test_month_marks_moods_and_goals() {
        let records = vec![
            DayRecord::new("maria", date(2026, 6, 3)).with_mood("😊"),
            DayRecord::new("maria", date(2026, 6, 4)),
            DayRecord::new("maria", date(2026, 7, 3)).with_mood("😢"),
        ];
        let goals = vec![goal(1, date(2026, 6, 4))];

        let view = month_view(2026, 6, &records, &goals).unwrap();
        let third = &view.days[2];
        assert_eq!(third.emoji.as_deref(), Some("😊"));
        assert!(!third.has_goal);

        let fourth = &view.days[3];
        assert!(fourth.has_record);
        assert_eq!(fourth.emoji, None);
        assert!(fourth.has_goal);
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        assert!(matches!(
            month_view(2026, 13, &[], &[]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_day_detail() {
        let day = date(2026, 6, 4);
        let records = vec![DayRecord::new("maria", day).with_journal("Walked by the sea")];
        let goals = vec![goal(1, day), goal(2, date(2026, 6, 5)), goal(3, day)];

        let detail = day_detail(day, &records, &goals);
        assert_eq!(detail.record.unwrap().journal_text, "Walked by the sea");
        assert_eq!(detail.goals.iter().map(|g| g.id).collect::<Vec<_>>(), vec![1, 3]);

        assert!(day_detail(date(2026, 6, 9), &records, &goals).record.is_none());
    }
}
