use crate::{
    clock::LocalSlot,
    models::reminder::{Reminder, ReminderFrequency},
};

/// Secondary checks applied after the store matched `reminder.time` to the slot.
pub fn is_due(reminder: &Reminder, slot: &LocalSlot) -> bool {
    if reminder.last_sent_date == Some(slot.date) {
        return false;
    }

    match reminder.frequency {
        ReminderFrequency::Daily => true,
        ReminderFrequency::Weekly | ReminderFrequency::Custom => {
            reminder.days_of_week.contains(slot.weekday)
        }
    }
}
