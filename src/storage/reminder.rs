use async_trait::async_trait;

use crate::{
    dispatch::WriteBatch,
    models::{
        notification::QueuedMail,
        reminder::{NewReminder, Reminder, ReminderId, ReminderTime, UpdateReminder},
    },
};

use super::StorageError;

/// Reminder records plus the outbound mail collection they feed.
///
/// Every user-facing operation is scoped to the owner: a reminder that belongs
/// to somebody else behaves as if it did not exist.
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    async fn get(&self, user_id: &str, id: ReminderId) -> Result<Option<Reminder>, StorageError>;
    async fn get_all_user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, StorageError>;
    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError>;
    async fn update(
        &self,
        user_id: &str,
        id: ReminderId,
        update: UpdateReminder,
    ) -> Result<Reminder, StorageError>;
    async fn delete(&self, user_id: &str, id: ReminderId) -> Result<(), StorageError>;

    /// All reminders, of every user, whose time is exactly `time`.
    async fn get_due_at(&self, time: &ReminderTime) -> Result<Vec<Reminder>, StorageError>;

    /// Applies every write in `batch` or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError>;

    async fn queued_mail(&self) -> Result<Vec<QueuedMail>, StorageError>;
}
