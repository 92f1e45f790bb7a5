pub mod habit;
pub mod notification;
pub mod reminder;

pub use chrono;
pub use chrono_tz;

use thiserror::Error;

pub type UserId = String;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown delivery channel {0:?}")]
    InvalidChannel(String),

    #[error("Unknown reminder frequency {0:?}")]
    InvalidFrequency(String),

    #[error("Reminder time must be HH:MM, got {0:?}")]
    InvalidTime(String),

    #[error("Weekday index must be 0..=6, got {0:?}")]
    InvalidWeekday(String),

    #[error("Invalid badge list {0:?}")]
    InvalidBadges(String),

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}
