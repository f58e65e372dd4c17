use futures_util::FutureExt;

use crate::auth::password::hash_password;
use crate::db::{LiveQuery, Store, Table};
use crate::error::{AppError, AppResult};
use crate::models::user::{grants_admin, User};

#[derive(Clone)]
pub struct UserRepository {
    store: Store,
}

impl UserRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Exact, case-sensitive lookup.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.store.pool())
            .await?;
        Ok(user)
    }

    /// Inserts a new account. The admin flag follows the username rule in
    /// [`grants_admin`]. An existing username is a `Conflict` and leaves the
    /// table untouched.
    pub async fn register(&self, username: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.store.pool())
            .await?;
        if existing > 0 {
            return Err(AppError::Conflict("User already exists".into()));
        }

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(grants_admin(username))
        .fetch_one(self.store.pool())
        .await;

        let user = match result {
            Ok(user) => user,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(AppError::Conflict("User already exists".into()));
            }
            Err(e) => return Err(e.into()),
        };

        self.store.notify(Table::Users);
        tracing::info!(username = %user.username, is_admin = user.is_admin, "User registered");
        Ok(user)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.store.pool())
            .await?;
        Ok(n)
    }

    pub async fn all_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, username")
            .fetch_all(self.store.pool())
            .await?;
        Ok(users)
    }

    pub fn all_users_live(&self) -> LiveQuery<User> {
        let repo = self.clone();
        self.store.live(Table::Users, move || {
            let repo = repo.clone();
            async move { repo.all_users().await }.boxed()
        })
    }

    /// Creates the `admin` account if it does not exist yet. Returns whether
    /// an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<bool> {
        if self.find_by_username("admin").await?.is_some() {
            return Ok(false);
        }

        let hash = hash_password(password)?;
        match self.register("admin", email, &hash).await {
            Ok(_) => Ok(true),
            // Created concurrently; same end state.
            Err(AppError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;

    async fn repo() -> UserRepository {
        UserRepository::new(test_store().await)
    }

    #[tokio::test]
    async fn test_register_and_find() {
        let repo = repo().await;
        let user = repo.register("maria", "maria@example.com", "hash").await.unwrap();
        assert!(!user.is_admin);

        let found = repo.find_by_username("maria").await.unwrap().unwrap();
        assert_eq!(found.email, "maria@example.com");
        assert!(repo.find_by_username("Maria").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_username_registers_as_admin() {
        let repo = repo().await;
        let admin = repo.register("Admin", "a@example.com", "hash").await.unwrap();
        assert!(admin.is_admin);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let repo = repo().await;
        repo.register("maria", "maria@example.com", "hash").await.unwrap();

        let err = repo.register("maria", "other@example.com", "hash2").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let repo = repo().await;
        assert!(repo.ensure_admin("admin@example.com", "correcthorse").await.unwrap());
        assert!(!repo.ensure_admin("admin@example.com", "correcthorse").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_users_live_sees_registration() {
        let repo = repo().await;
        let mut live = repo.all_users_live();
        assert!(live.next().await.unwrap().is_empty());

        repo.register("maria", "maria@example.com", "hash").await.unwrap();
        let users = live.next().await.unwrap();
        assert_eq!(users.len(), 1);
    }
}
