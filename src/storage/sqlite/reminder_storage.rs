mod model;

use async_trait::async_trait;
use chrono::Utc;
use model::{MailStorageModel, ReminderStorageModel, valid_reminders};

use crate::{
    dispatch::{BatchWrite, WriteBatch},
    models::{
        notification::QueuedMail,
        reminder::{NewReminder, Reminder, ReminderId, ReminderTime, UpdateReminder},
    },
    storage::{ReminderStorage, StorageError},
};

pub struct SqliteReminderStorage {
    pool: sqlx::SqlitePool,
}

impl SqliteReminderStorage {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Writes the user-editable columns back. `last_sent_date` is owned by
    /// [`ReminderStorage::commit`] and is never overwritten here.
    async fn save(&self, reminder: Reminder) -> Result<Reminder, StorageError> {
        let ReminderStorageModel {
            id,
            user_id: _,
            habit_id,
            channel,
            time,
            frequency,
            days_of_week,
            message_template,
            last_sent_date: _,
            user_email,
            push_token,
            created_at: _,
            updated_at,
        } = reminder.into();

        let updated = sqlx::query_as::<_, ReminderStorageModel>(
            "
UPDATE reminders
SET habit_id = ?,
    channel = ?,
    time = ?,
    frequency = ?,
    days_of_week = ?,
    message_template = ?,
    user_email = ?,
    push_token = ?,
    updated_at = ?
WHERE id = ?
RETURNING *
",
        )
        .bind(habit_id)
        .bind(channel)
        .bind(time)
        .bind(frequency)
        .bind(days_of_week)
        .bind(message_template)
        .bind(user_email)
        .bind(push_token)
        .bind(updated_at)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated.try_into()?)
    }
}

#[async_trait]
impl ReminderStorage for SqliteReminderStorage {
    async fn get(&self, user_id: &str, id: ReminderId) -> Result<Option<Reminder>, StorageError> {
        let reminder = sqlx::query_as::<_, ReminderStorageModel>(
            "SELECT * FROM reminders WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reminder.map(Reminder::try_from).transpose()?)
    }

    async fn get_all_user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, StorageError> {
        let reminders = sqlx::query_as::<_, ReminderStorageModel>(
            "SELECT * FROM reminders WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(valid_reminders(reminders))
    }

    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        let ReminderStorageModel {
            id: _,
            user_id,
            habit_id,
            channel,
            time,
            frequency,
            days_of_week,
            message_template,
            last_sent_date,
            user_email,
            push_token,
            created_at,
            updated_at,
        } = reminder.into_reminder(0, Utc::now()).into();

        let created_reminder = sqlx::query_as::<_, ReminderStorageModel>(
            "INSERT INTO reminders (user_id, habit_id, channel, time, frequency, days_of_week,
    message_template, last_sent_date, user_email, push_token, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(channel)
        .bind(time)
        .bind(frequency)
        .bind(days_of_week)
        .bind(message_template)
        .bind(last_sent_date)
        .bind(user_email)
        .bind(push_token)
        .bind(created_at)
        .bind(updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created_reminder.try_into()?)
    }

    async fn update(
        &self,
        user_id: &str,
        id: ReminderId,
        update: UpdateReminder,
    ) -> Result<Reminder, StorageError> {
        let mut reminder = self
            .get(user_id, id)
            .await?
            .ok_or_else(|| StorageError::reminder_not_found(id))?;

        reminder.apply(update, Utc::now());
        self.save(reminder).await
    }

    async fn delete(&self, user_id: &str, id: ReminderId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::reminder_not_found(id));
        }
        Ok(())
    }

    async fn get_due_at(&self, time: &ReminderTime) -> Result<Vec<Reminder>, StorageError> {
        let reminders = sqlx::query_as::<_, ReminderStorageModel>(
            "SELECT * FROM reminders WHERE time = ? ORDER BY id",
        )
        .bind(time.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(valid_reminders(reminders))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for write in batch.into_writes() {
            match write {
                BatchWrite::EnqueueMail(mail) => {
                    sqlx::query(
                        "INSERT INTO mail (recipient, subject, body, created_at) VALUES (?, ?, ?, ?)",
                    )
                    .bind(mail.to)
                    .bind(mail.subject)
                    .bind(mail.text)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                }
                BatchWrite::MarkSent { reminder_id, date } => {
                    let result = sqlx::query(
                        "UPDATE reminders SET last_sent_date = ? WHERE id = ?",
                    )
                    .bind(date)
                    .bind(reminder_id)
                    .execute(&mut *tx)
                    .await?;

                    // Dropping `tx` rolls back everything queued so far.
                    if result.rows_affected() == 0 {
                        return Err(StorageError::reminder_not_found(reminder_id));
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn queued_mail(&self) -> Result<Vec<QueuedMail>, StorageError> {
        let mail = sqlx::query_as::<_, MailStorageModel>("SELECT * FROM mail ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(mail.into_iter().map(Into::into).collect())
    }
}
