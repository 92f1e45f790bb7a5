mod model;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{HabitLogStorageModel, HabitStorageModel};
use sqlx::SqliteConnection;

use crate::{
    models::habit::{EditHabit, Habit, HabitId, NewHabit},
    storage::{HabitStorage, StorageError, StreakIncrement},
};

pub struct SqliteHabitStorage {
    pool: sqlx::SqlitePool,
}

impl SqliteHabitStorage {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

async fn fetch_owned(
    conn: &mut SqliteConnection,
    user_id: &str,
    id: HabitId,
) -> Result<Habit, StorageError> {
    let habit = sqlx::query_as::<_, HabitStorageModel>(
        "SELECT * FROM habits WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| StorageError::habit_not_found(id))?;

    Ok(habit.try_into()?)
}

async fn save(conn: &mut SqliteConnection, habit: Habit) -> Result<Habit, StorageError> {
    let HabitStorageModel {
        id,
        user_id: _,
        name,
        duration_days,
        streak,
        badges,
        created_at: _,
        updated_at,
    } = habit.into();

    let saved = sqlx::query_as::<_, HabitStorageModel>(
        "
UPDATE habits
SET name = ?,
    duration_days = ?,
    streak = ?,
    badges = ?,
    updated_at = ?
WHERE id = ?
RETURNING *
",
    )
    .bind(name)
    .bind(duration_days)
    .bind(streak)
    .bind(badges)
    .bind(updated_at)
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(saved.try_into()?)
}

#[async_trait]
impl HabitStorage for SqliteHabitStorage {
    async fn create(&self, habit: NewHabit) -> Result<Habit, StorageError> {
        let HabitStorageModel {
            id: _,
            user_id,
            name,
            duration_days,
            streak,
            badges,
            created_at,
            updated_at,
        } = habit.into_habit(0, Utc::now())?.into();

        let created = sqlx::query_as::<_, HabitStorageModel>(
            "INSERT INTO habits (user_id, name, duration_days, streak, badges, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(duration_days)
        .bind(streak)
        .bind(badges)
        .bind(created_at)
        .bind(updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created.try_into()?)
    }

    async fn get(&self, user_id: &str, id: HabitId) -> Result<Option<Habit>, StorageError> {
        let habit = sqlx::query_as::<_, HabitStorageModel>(
            "SELECT * FROM habits WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(habit.map(Habit::try_from).transpose()?)
    }

    async fn get_all_user_habits(&self, user_id: &str) -> Result<Vec<Habit>, StorageError> {
        let habits = sqlx::query_as::<_, HabitStorageModel>(
            "SELECT * FROM habits WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(habits
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                Habit::try_from(row)
                    .inspect_err(|e| {
                        log::warn!("Skipping invalid habit record. [id = {id}, error = {e}]")
                    })
                    .ok()
            })
            .collect())
    }

    async fn edit(
        &self,
        user_id: &str,
        id: HabitId,
        edit: EditHabit,
    ) -> Result<Habit, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut habit = fetch_owned(&mut tx, user_id, id).await?;
        habit.apply(edit, Utc::now())?;
        let habit = save(&mut tx, habit).await?;
        tx.commit().await?;
        Ok(habit)
    }

    async fn delete(&self, user_id: &str, id: HabitId) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        fetch_owned(&mut tx, user_id, id).await?;

        sqlx::query("DELETE FROM habit_logs WHERE habit_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM habits WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn increment_streak(
        &self,
        user_id: &str,
        id: HabitId,
        at: DateTime<Utc>,
    ) -> Result<StreakIncrement, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut habit = fetch_owned(&mut tx, user_id, id).await?;
        let awarded_badge = habit.record_increment(Utc::now());
        let habit = save(&mut tx, habit).await?;

        sqlx::query("INSERT INTO habit_logs (habit_id, logged_at) VALUES (?, ?)")
            .bind(id)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if let Some(badge) = awarded_badge {
            log::info!("Habit {id} reached the {badge}-day milestone");
        }

        Ok(StreakIncrement {
            habit,
            awarded_badge,
        })
    }

    async fn reset_streak(&self, user_id: &str, id: HabitId) -> Result<Habit, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut habit = fetch_owned(&mut tx, user_id, id).await?;
        habit.reset(Utc::now());
        let habit = save(&mut tx, habit).await?;
        tx.commit().await?;
        Ok(habit)
    }

    async fn recent_logs(
        &self,
        user_id: &str,
        id: HabitId,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        fetch_owned(&mut conn, user_id, id).await?;

        let logs = sqlx::query_as::<_, HabitLogStorageModel>(
            "SELECT logged_at FROM habit_logs WHERE habit_id = ? ORDER BY logged_at DESC, id DESC LIMIT ?",
        )
        .bind(id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&mut *conn)
        .await?;

        Ok(logs.into_iter().map(|log| log.logged_at).collect())
    }
}
