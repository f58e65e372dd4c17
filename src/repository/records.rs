use chrono::NaiveDate;
use futures_util::FutureExt;

use crate::db::{LiveQuery, Store, Table};
use crate::error::AppResult;
use crate::models::day_record::{DayRecord, DayRecordRow};
use crate::models::habit_list;

/// A user's records as seen by a screen: either still loading or the full
/// result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSnapshot {
    Loading,
    Loaded(Vec<DayRecord>),
}

/// Habit list for `date` when the user opens it for the first time: the list
/// of the most recent earlier day that has one, else the default list. No
/// decision while the records are still loading, so a slow query never seeds
/// the defaults over a real history.
pub fn seed_habits(snapshot: &RecordSnapshot, date: NaiveDate) -> Option<Vec<String>> {
    let RecordSnapshot::Loaded(records) = snapshot else {
        return None;
    };

    let mut by_date: Vec<&DayRecord> = records.iter().filter(|r| r.date_key < date).collect();
    by_date.sort_by(|a, b| b.date_key.cmp(&a.date_key));

    let carried = by_date
        .into_iter()
        .find(|r| !r.all_habits.is_empty())
        .map(|r| r.all_habits.clone());

    Some(carried.unwrap_or_else(habit_list::default_habits))
}

/// The record for `date` in a loaded snapshot, if one exists.
pub fn record_for(records: &[DayRecord], date: NaiveDate) -> Option<&DayRecord> {
    records.iter().find(|r| r.date_key == date)
}

#[derive(Clone)]
pub struct RecordRepository {
    store: Store,
}

impl RecordRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Newest day first.
    pub async fn records_by_user(&self, user_id: &str) -> AppResult<Vec<DayRecord>> {
        let rows = sqlx::query_as::<_, DayRecordRow>(
            "SELECT * FROM daily_records WHERE user_id = ? ORDER BY date_key DESC",
        )
        .bind(user_id)
        .fetch_all(self.store.pool())
        .await?;

        rows.into_iter().map(DayRecord::try_from).collect()
    }

    pub fn records_by_user_live(&self, user_id: &str) -> LiveQuery<DayRecord> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        self.store.live(Table::DailyRecords, move || {
            let repo = repo.clone();
            let user_id = user_id.clone();
            async move { repo.records_by_user(&user_id).await }.boxed()
        })
    }

    /// Every user's records. Only the admin statistics read this.
    pub async fn all_records(&self) -> AppResult<Vec<DayRecord>> {
        let rows = sqlx::query_as::<_, DayRecordRow>(
            "SELECT * FROM daily_records ORDER BY date_key DESC, user_id",
        )
        .fetch_all(self.store.pool())
        .await?;

        rows.into_iter().map(DayRecord::try_from).collect()
    }

    pub fn all_records_live(&self) -> LiveQuery<DayRecord> {
        let repo = self.clone();
        self.store.live(Table::DailyRecords, move || {
            let repo = repo.clone();
            async move { repo.all_records().await }.boxed()
        })
    }

    pub async fn find_record(&self, user_id: &str, date: NaiveDate) -> AppResult<Option<DayRecord>> {
        let row = sqlx::query_as::<_, DayRecordRow>(
            "SELECT * FROM daily_records WHERE user_id = ? AND date_key = ?",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(self.store.pool())
        .await?;

        row.map(DayRecord::try_from).transpose()
    }

    /// Replaces the whole record for `(user_id, date_key)` or inserts it.
    /// The stored row keeps its id; the last write wins.
    pub async fn upsert_record(&self, record: DayRecord) -> AppResult<DayRecord> {
        let record = record.normalized();

        let row = sqlx::query_as::<_, DayRecordRow>(
            r#"
            INSERT INTO daily_records
                (user_id, date_key, emoji, journal_text, completed_habits, all_habits)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, date_key) DO UPDATE SET
                emoji = excluded.emoji,
                journal_text = excluded.journal_text,
                completed_habits = excluded.completed_habits,
                all_habits = excluded.all_habits
            RETURNING *
            "#,
        )
        .bind(&record.user_id)
        .bind(record.date_key)
        .bind(&record.emoji)
        .bind(&record.journal_text)
        .bind(habit_list::encode(&record.completed_habits)?)
        .bind(habit_list::encode(&record.all_habits)?)
        .fetch_one(self.store.pool())
        .await?;

        self.store.notify(Table::DailyRecords);
        tracing::debug!(
            user_id = %record.user_id,
            date_key = %record.date_key,
            "Day record saved"
        );

        DayRecord::try_from(row)
    }

    /// The user's record for `date`, created and seeded with carried-forward
    /// habits when the day is opened for the first time.
    pub async fn open_day(&self, user_id: &str, date: NaiveDate) -> AppResult<DayRecord> {
        let records = self.records_by_user(user_id).await?;
        if let Some(existing) = record_for(&records, date) {
            return Ok(existing.clone());
        }

        let habits = seed_habits(&RecordSnapshot::Loaded(records), date)
            .unwrap_or_else(habit_list::default_habits);
        let fresh = DayRecord::new(user_id, date).with_habits(habits);

        // A concurrent open of the same day may have inserted first; keep that row.
        let inserted = sqlx::query(
            r#"
            INSERT INTO daily_records (user_id, date_key, all_habits)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id, date_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(habit_list::encode(&fresh.all_habits)?)
        .execute(self.store.pool())
        .await?
        .rows_affected();

        if inserted > 0 {
            self.store.notify(Table::DailyRecords);
            tracing::debug!(user_id = %user_id, date_key = %date, "Day opened");
        }

        Ok(self.find_record(user_id, date).await?.unwrap_or(fresh))
    }
}
