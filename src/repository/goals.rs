use chrono::NaiveDate;
use futures_util::FutureExt;

use crate::db::{LiveQuery, Store, Table};
use crate::dto::NewGoal;
use crate::error::{AppError, AppResult};
use crate::models::Goal;

#[derive(Clone)]
pub struct GoalRepository {
    store: Store,
}

impl GoalRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Earliest target date first.
    pub async fn goals_by_user(&self, user_id: &str) -> AppResult<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(
            "SELECT * FROM goals WHERE user_id = ? ORDER BY date, id",
        )
        .bind(user_id)
        .fetch_all(self.store.pool())
        .await?;
        Ok(goals)
    }

    pub fn goals_by_user_live(&self, user_id: &str) -> LiveQuery<Goal> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        self.store.live(Table::Goals, move || {
            let repo = repo.clone();
            let user_id = user_id.clone();
            async move { repo.goals_by_user(&user_id).await }.boxed()
        })
    }

    pub async fn goals_on(&self, user_id: &str, date: NaiveDate) -> AppResult<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(
            "SELECT * FROM goals WHERE user_id = ? AND date = ? ORDER BY id",
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(self.store.pool())
        .await?;
        Ok(goals)
    }

    /// New goals start incomplete. Title rules are checked by the caller.
    pub async fn insert_goal(&self, goal: NewGoal) -> AppResult<Goal> {
        let goal = sqlx::query_as::<_, Goal>(
            r#"
            INSERT INTO goals (user_id, title, date, is_completed)
            VALUES (?, ?, ?, 0)
            RETURNING *
            "#,
        )
        .bind(&goal.user_id)
        .bind(goal.title.trim())
        .bind(goal.date)
        .fetch_one(self.store.pool())
        .await?;

        self.store.notify(Table::Goals);
        tracing::debug!(goal_id = goal.id, user_id = %goal.user_id, "Goal created");
        Ok(goal)
    }

    /// Flips completion in the store, so back-to-back toggles never act on a
    /// stale copy.
    pub async fn toggle_goal(&self, id: i64) -> AppResult<Goal> {
        let goal = sqlx::query_as::<_, Goal>(
            "UPDATE goals SET is_completed = NOT is_completed WHERE id = ? RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.store.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Goal {id} not found")))?;

        self.store.notify(Table::Goals);
        tracing::debug!(goal_id = id, is_completed = goal.is_completed, "Goal toggled");
        Ok(goal)
    }

    pub async fn update_goal(&self, goal: &Goal) -> AppResult<Goal> {
        let updated = sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET user_id = ?, title = ?, date = ?, is_completed = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&goal.user_id)
        .bind(&goal.title)
        .bind(goal.date)
        .bind(goal.is_completed)
        .bind(goal.id)
        .fetch_optional(self.store.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", goal.id)))?;

        self.store.notify(Table::Goals);
        Ok(updated)
    }

    /// Returns whether a goal was deleted.
    pub async fn delete_goal(&self, id: i64) -> AppResult<bool> {
        let deleted = sqlx::query("DELETE FROM goals WHERE id = ?")
            .bind(id)
            .execute(self.store.pool())
            .await?
            .rows_affected();

        if deleted > 0 {
            self.store.notify(Table::Goals);
            tracing::debug!(goal_id = id, "Goal deleted");
        }
        Ok(deleted > 0)
    }
}
