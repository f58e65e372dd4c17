//! Live queries: a handle that re-emits the full result set of a query every
//! time the table it watches changes.

use futures_util::future::BoxFuture;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::error::{AppError, AppResult};

/// Tables that publish change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    DailyRecords,
    Goals,
    Settings,
}

pub(crate) type FetchFn<T> = Box<dyn Fn() -> BoxFuture<'static, AppResult<Vec<T>>> + Send + Sync>;

pub struct LiveQuery<T> {
    table: Table,
    rx: broadcast::Receiver<Table>,
    fetch: FetchFn<T>,
    primed: bool,
}

impl<T> LiveQuery<T> {
    pub(crate) fn new(table: Table, rx: broadcast::Receiver<Table>, fetch: FetchFn<T>) -> Self {
        Self {
            table,
            rx,
            fetch,
            primed: false,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// First call returns the current snapshot. Every later call waits for a
    /// write to the watched table and returns the refreshed snapshot.
    pub async fn next(&mut self) -> AppResult<Vec<T>> {
        if !self.primed {
            self.primed = true;
            // The first snapshot already reflects writes queued since subscribing.
            self.drain();
            return (self.fetch)().await;
        }

        loop {
            match self.rx.recv().await {
                Ok(table) if table == self.table => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(table = ?self.table, skipped, "Live query lagged, re-querying");
                    break;
                }
                Err(RecvError::Closed) => return Err(AppError::StoreClosed),
            }
        }

        // Coalesce a burst of writes into one emission; the query below sees all of them.
        self.drain();

        (self.fetch)().await
    }

    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Returns the refreshed snapshot if the watched table changed since the
    /// last emission, without waiting.
    pub async fn poll(&mut self) -> AppResult<Option<Vec<T>>> {
        if !self.primed {
            return self.next().await.map(Some);
        }

        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(table) => changed |= table == self.table,
                Err(TryRecvError::Lagged(_)) => changed = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    if changed {
                        break;
                    }
                    return Err(AppError::StoreClosed);
                }
            }
        }

        if changed {
            (self.fetch)().await.map(Some)
        } else {
            Ok(None)
        }
    }
}
