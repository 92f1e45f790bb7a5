use chrono::{DateTime, Utc};

use crate::models::{
    ParseError,
    habit::{Habit, badges_to_string, parse_badges},
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HabitStorageModel {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub duration_days: i64,
    pub streak: i64,
    pub badges: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Habit> for HabitStorageModel {
    fn from(value: Habit) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            duration_days: i64::from(value.duration_days),
            streak: i64::from(value.streak),
            badges: badges_to_string(&value.badges),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<HabitStorageModel> for Habit {
    type Error = ParseError;

    fn try_from(value: HabitStorageModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            duration_days: to_u32("duration_days", value.duration_days)?,
            streak: to_u32("streak", value.streak)?,
            badges: parse_badges(&value.badges)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn to_u32(field: &'static str, value: i64) -> Result<u32, ParseError> {
    u32::try_from(value).map_err(|_| ParseError::OutOfRange { field, value })
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HabitLogStorageModel {
    pub logged_at: DateTime<Utc>,
}
