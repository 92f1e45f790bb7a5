use thiserror::Error;

use crate::models::{ParseError, habit::HabitValidationError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{kind} {id} does not exist")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Stored record is invalid: {0}")]
    InvalidRecord(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] HabitValidationError),
}

impl StorageError {
    pub fn reminder_not_found(id: i64) -> Self {
        Self::NotFound { kind: "Reminder", id }
    }

    pub fn habit_not_found(id: i64) -> Self {
        Self::NotFound { kind: "Habit", id }
    }
}
