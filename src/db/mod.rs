pub mod live;
pub mod pool;

use futures_util::future::BoxFuture;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::AppResult;

pub use live::{LiveQuery, Table};

const CHANGE_FEED_CAPACITY: usize = 256;

/// Handle to the embedded database plus the change feed live queries
/// subscribe to. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    changes: broadcast::Sender<Table>,
}

impl Store {
    pub async fn open(config: &Config) -> AppResult<Self> {
        let pool = pool::create_pool(config).await?;
        Ok(Self::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Publish a write. No subscribers is not an error.
    pub fn notify(&self, table: Table) {
        let _ = self.changes.send(table);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.changes.subscribe()
    }

    pub fn live<T, F>(&self, table: Table, fetch: F) -> LiveQuery<T>
    where
        F: Fn() -> BoxFuture<'static, AppResult<Vec<T>>> + Send + Sync + 'static,
    {
        LiveQuery::new(table, self.subscribe(), Box::new(fetch))
    }

    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    Store::open(&Config::in_memory())
        .await
        .expect("in-memory store should open")
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[tokio::test]
    async fn test_in_memory_store_is_migrated() {
        let store = test_store().await;
        assert!(store.ping().await);

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(store.pool())
                .await
                .unwrap();
        for expected in ["daily_records", "goals", "settings", "users"] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_first_snapshot_absorbs_earlier_writes() {
        let store = test_store().await;
        let pool = store.pool().clone();
        let mut live = store.live(Table::Settings, move || {
            let pool = pool.clone();
            async move {
                let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
                    .fetch_one(&pool)
                    .await?;
                Ok::<_, crate::error::AppError>(vec![n])
            }
            .boxed()
        });

        sqlx::query("INSERT INTO settings (key, value) VALUES ('dark_mode', 'true')")
            .execute(store.pool())
            .await
            .unwrap();
        store.notify(Table::Settings);

        assert_eq!(live.next().await.unwrap(), vec![1]);
        assert!(live.poll().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_query_emits_after_matching_write() {
        let store = test_store().await;
        let pool = store.pool().clone();
        let mut live = store.live(Table::Settings, move || {
            let pool = pool.clone();
            async move {
                let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM settings ORDER BY key")
                    .fetch_all(&pool)
                    .await?;
                Ok::<_, crate::error::AppError>(keys)
            }
            .boxed()
        });

        assert!(live.next().await.unwrap().is_empty());
        assert!(live.poll().await.unwrap().is_none());

        sqlx::query("INSERT INTO settings (key, value) VALUES ('dark_mode', 'true')")
            .execute(store.pool())
            .await
            .unwrap();
        store.notify(Table::Goals);
        assert!(live.poll().await.unwrap().is_none(), "other tables are ignored");

        store.notify(Table::Settings);
        let keys = live.next().await.unwrap();
        assert_eq!(keys, vec!["dark_mode".to_string()]);
    }
}
