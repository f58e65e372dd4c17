use std::collections::HashMap;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{DayRecord, UserProfile, UserSession};
use crate::repository::{RecordRepository, UserRepository};

/// Global numbers for the admin panel.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: usize,
    /// `None` until some record carries a mood.
    pub most_used_emoji: Option<String>,
    pub users: Vec<UserProfile>,
}

/// Mood picked most often across `records`. Days without a mood are skipped;
/// a tie goes to the emoji that sorts first.
pub fn most_used_emoji(records: &[DayRecord]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records.iter().filter(|r| r.has_mood()) {
        *counts.entry(record.emoji.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a, a_n), (b, b_n)| a_n.cmp(b_n).then_with(|| b.cmp(a)))
        .map(|(emoji, _)| emoji.to_string())
}

pub async fn admin_stats(
    session: &UserSession,
    users: &UserRepository,
    records: &RecordRepository,
) -> AppResult<AdminStats> {
    if !session.is_admin {
        tracing::warn!(username = %session.username, "Non-admin asked for admin stats");
        return Err(AppError::Forbidden);
    }

    let all_users = users.all_users().await?;
    let all_records = records.all_records().await?;

    Ok(AdminStats {
        total_users: all_users.len(),
        most_used_emoji: most_used_emoji(&all_records),
        users: all_users.into_iter().map(UserProfile::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;
    use chrono::NaiveDate;

    fn mood(user: &str, d: u32, emoji: &str) -> DayRecord {
        DayRecord::new(user, NaiveDate::from_ymd_opt(2026, 2, d).unwrap()).with_mood(emoji)
    }

    #[test]
    fn test_most_used_emoji() {
        let records = vec![
            mood("maria", 1, "😊"),
            mood("maria", 2, "😢"),
            mood("pablo", 1, "😊"),
            mood("pablo", 2, ""),
            mood("pablo", 3, ""),
            mood("pablo", 4, ""),
        ];
        assert_eq!(most_used_emoji(&records).as_deref(), Some("😊"));
    }

    #[test]
    fn test_most_used_emoji_empty_and_ties() {
        assert_eq!(most_used_emoji(&[]), None);
        assert_eq!(most_used_emoji(&[mood("maria", 1, "")]), None);

        let tie = vec![mood("maria", 1, "🤩"), mood("maria", 2, "😁")];
        let expected = if "😁" < "🤩" { "😁" } else { "🤩" };
        assert_eq!(most_used_emoji(&tie).as_deref(), Some(expected));
    }

    #[tokio::test]
    async fn test_stats_require_admin() {
        let store = test_store().await;
        let users = UserRepository::new(store.clone());
        let records = RecordRepository::new(store);
        users.register("admin", "a@example.com", "hash").await.unwrap();
        users.register("maria", "m@example.com", "hash").await.unwrap();
        records.upsert_record(mood("maria", 1, "😊")).await.unwrap();

        let maria = UserSession {
            username: "maria".into(),
            is_admin: false,
        };
        assert!(matches!(
            admin_stats(&maria, &users, &records).await,
            Err(AppError::Forbidden)
        ));

        let admin = UserSession {
            username: "admin".into(),
            is_admin: true,
        };
        let stats = admin_stats(&admin, &users, &records).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.most_used_emoji.as_deref(), Some("😊"));
    }
}
