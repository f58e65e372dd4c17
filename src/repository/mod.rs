//! Data access. Each repository owns a [`Store`](crate::db::Store) handle and
//! publishes every successful write on its change feed.

pub mod admin;
pub mod goals;
pub mod records;
pub mod users;

pub use admin::{admin_stats, AdminStats};
pub use goals::GoalRepository;
pub use records::{seed_habits, RecordRepository, RecordSnapshot};
pub use users::UserRepository;
