use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::models::habit::{
    EditHabit, HEATMAP_LOG_LIMIT, HEATMAP_WINDOW_DAYS, Habit, HabitId, Heatmap, NewHabit,
};

use super::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakIncrement {
    pub habit: Habit,
    pub awarded_badge: Option<u32>,
}

#[async_trait]
pub trait HabitStorage: Send + Sync {
    async fn create(&self, habit: NewHabit) -> Result<Habit, StorageError>;
    async fn get(&self, user_id: &str, id: HabitId) -> Result<Option<Habit>, StorageError>;
    async fn get_all_user_habits(&self, user_id: &str) -> Result<Vec<Habit>, StorageError>;
    async fn edit(
        &self,
        user_id: &str,
        id: HabitId,
        edit: EditHabit,
    ) -> Result<Habit, StorageError>;
    async fn delete(&self, user_id: &str, id: HabitId) -> Result<(), StorageError>;

    /// Bumps the streak, awards a milestone badge if reached and logs the
    /// increment at `at`.
    async fn increment_streak(
        &self,
        user_id: &str,
        id: HabitId,
        at: DateTime<Utc>,
    ) -> Result<StreakIncrement, StorageError>;
    async fn reset_streak(&self, user_id: &str, id: HabitId) -> Result<Habit, StorageError>;

    /// Newest first.
    async fn recent_logs(
        &self,
        user_id: &str,
        id: HabitId,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>, StorageError>;

    async fn heatmap(
        &self,
        user_id: &str,
        id: HabitId,
        end_date: NaiveDate,
        timezone: Tz,
    ) -> Result<Heatmap, StorageError> {
        let logs = self.recent_logs(user_id, id, HEATMAP_LOG_LIMIT).await?;
        Ok(Heatmap::build(&logs, end_date, HEATMAP_WINDOW_DAYS, timezone))
    }
}
