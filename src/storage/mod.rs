mod error;
mod habit;
mod reminder;

pub mod memory;
pub mod sqlite;

pub use error::StorageError;
pub use habit::{HabitStorage, StreakIncrement};
pub use reminder::ReminderStorage;
