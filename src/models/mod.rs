pub mod day_record;
pub mod goal;
pub mod habit_list;
pub mod user;

pub use day_record::DayRecord;
pub use goal::Goal;
pub use user::{User, UserProfile, UserSession};
