use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    dispatch::{BatchWrite, WriteBatch},
    models::{
        habit::{EditHabit, Habit, HabitId, NewHabit},
        notification::{MailId, QueuedMail},
        reminder::{NewReminder, Reminder, ReminderId, ReminderTime, UpdateReminder},
    },
};

use super::{HabitStorage, ReminderStorage, StorageError, StreakIncrement};

#[derive(Default)]
struct InMemoryReminderStore {
    current_id: ReminderId,
    current_mail_id: MailId,
    reminders: HashMap<ReminderId, Reminder>,
    mail: Vec<QueuedMail>,
}

impl InMemoryReminderStore {
    fn owned_mut(&mut self, user_id: &str, id: ReminderId) -> Result<&mut Reminder, StorageError> {
        self.reminders
            .get_mut(&id)
            .filter(|reminder| reminder.user_id == user_id)
            .ok_or_else(|| StorageError::reminder_not_found(id))
    }
}

/// Process-local reminder store, used by tests and for running without a database.
#[derive(Default)]
pub struct InMemoryReminderStorage {
    store: RwLock<InMemoryReminderStore>,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderStorage for InMemoryReminderStorage {
    async fn get(&self, user_id: &str, id: ReminderId) -> Result<Option<Reminder>, StorageError> {
        let store = self.store.read().await;
        Ok(store
            .reminders
            .get(&id)
            .filter(|reminder| reminder.user_id == user_id)
            .cloned())
    }

    async fn get_all_user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, StorageError> {
        let store = self.store.read().await;
        let mut reminders: Vec<Reminder> = store
            .reminders
            .values()
            .filter(|reminder| reminder.user_id == user_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|reminder| reminder.id);
        Ok(reminders)
    }

    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        let mut store = self.store.write().await;
        store.current_id += 1;
        let reminder = reminder.into_reminder(store.current_id, Utc::now());
        store.reminders.insert(reminder.id, reminder.clone());

        log::debug!("Inserted reminder {}", reminder.id);
        Ok(reminder)
    }

    async fn update(
        &self,
        user_id: &str,
        id: ReminderId,
        update: UpdateReminder,
    ) -> Result<Reminder, StorageError> {
        let mut store = self.store.write().await;
        let reminder = store.owned_mut(user_id, id)?;
        reminder.apply(update, Utc::now());
        Ok(reminder.clone())
    }

    async fn delete(&self, user_id: &str, id: ReminderId) -> Result<(), StorageError> {
        let mut store = self.store.write().await;
        store.owned_mut(user_id, id)?;
        store.reminders.remove(&id);
        Ok(())
    }

    async fn get_due_at(&self, time: &ReminderTime) -> Result<Vec<Reminder>, StorageError> {
        let store = self.store.read().await;
        let mut reminders: Vec<Reminder> = store
            .reminders
            .values()
            .filter(|reminder| reminder.time == *time)
            .cloned()
            .collect();
        reminders.sort_by_key(|reminder| reminder.id);
        Ok(reminders)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut store = self.store.write().await;

        // Validate up front so a failing batch leaves nothing behind.
        for write in batch.writes() {
            if let BatchWrite::MarkSent { reminder_id, .. } = write {
                if !store.reminders.contains_key(reminder_id) {
                    return Err(StorageError::reminder_not_found(*reminder_id));
                }
            }
        }

        let now = Utc::now();
        for write in batch.into_writes() {
            match write {
                BatchWrite::EnqueueMail(mail) => {
                    store.current_mail_id += 1;
                    let id = store.current_mail_id;
                    store.mail.push(QueuedMail {
                        id,
                        mail,
                        created_at: now,
                    });
                }
                BatchWrite::MarkSent { reminder_id, date } => {
                    if let Some(reminder) = store.reminders.get_mut(&reminder_id) {
                        reminder.last_sent_date = Some(date);
                    }
                }
            }
        }

        Ok(())
    }

    async fn queued_mail(&self) -> Result<Vec<QueuedMail>, StorageError> {
        Ok(self.store.read().await.mail.clone())
    }
}

#[derive(Default)]
struct InMemoryHabitStore {
    current_id: HabitId,
    habits: HashMap<HabitId, Habit>,
    logs: HashMap<HabitId, Vec<DateTime<Utc>>>,
}

impl InMemoryHabitStore {
    fn owned_mut(&mut self, user_id: &str, id: HabitId) -> Result<&mut Habit, StorageError> {
        self.habits
            .get_mut(&id)
            .filter(|habit| habit.user_id == user_id)
            .ok_or_else(|| StorageError::habit_not_found(id))
    }
}

#[derive(Default)]
pub struct InMemoryHabitStorage {
    store: RwLock<InMemoryHabitStore>,
}

impl InMemoryHabitStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HabitStorage for InMemoryHabitStorage {
    async fn create(&self, habit: NewHabit) -> Result<Habit, StorageError> {
        let mut store = self.store.write().await;
        let habit = habit.into_habit(store.current_id + 1, Utc::now())?;
        store.current_id = habit.id;
        store.habits.insert(habit.id, habit.clone());
        Ok(habit)
    }

    async fn get(&self, user_id: &str, id: HabitId) -> Result<Option<Habit>, StorageError> {
        let store = self.store.read().await;
        Ok(store
            .habits
            .get(&id)
            .filter(|habit| habit.user_id == user_id)
            .cloned())
    }

    async fn get_all_user_habits(&self, user_id: &str) -> Result<Vec<Habit>, StorageError> {
        let store = self.store.read().await;
        let mut habits: Vec<Habit> = store
            .habits
            .values()
            .filter(|habit| habit.user_id == user_id)
            .cloned()
            .collect();
        habits.sort_by_key(|habit| habit.id);
        Ok(habits)
    }

    async fn edit(
        &self,
        user_id: &str,
        id: HabitId,
        edit: EditHabit,
    ) -> Result<Habit, StorageError> {
        let mut store = self.store.write().await;
        let habit = store.owned_mut(user_id, id)?;
        habit.apply(edit, Utc::now())?;
        Ok(habit.clone())
    }

    async fn delete(&self, user_id: &str, id: HabitId) -> Result<(), StorageError> {
        let mut store = self.store.write().await;
        store.owned_mut(user_id, id)?;
        store.habits.remove(&id);
        store.logs.remove(&id);
        Ok(())
    }

    async fn increment_streak(
        &self,
        user_id: &str,
        id: HabitId,
        at: DateTime<Utc>,
    ) -> Result<StreakIncrement, StorageError> {
        let mut store = self.store.write().await;
        let habit = store.owned_mut(user_id, id)?;
        let awarded_badge = habit.record_increment(Utc::now());
        let habit = habit.clone();
        store.logs.entry(id).or_default().push(at);

        Ok(StreakIncrement {
            habit,
            awarded_badge,
        })
    }

    async fn reset_streak(&self, user_id: &str, id: HabitId) -> Result<Habit, StorageError> {
        let mut store = self.store.write().await;
        let habit = store.owned_mut(user_id, id)?;
        habit.reset(Utc::now());
        Ok(habit.clone())
    }

    async fn recent_logs(
        &self,
        user_id: &str,
        id: HabitId,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>, StorageError> {
        let store = self.store.read().await;
        if !store.habits.get(&id).is_some_and(|habit| habit.user_id == user_id) {
            return Err(StorageError::habit_not_found(id));
        }

        let mut logs = store.logs.get(&id).cloned().unwrap_or_default();
        logs.sort_by(|a, b| b.cmp(a));
        logs.truncate(limit);
        Ok(logs)
    }
}
