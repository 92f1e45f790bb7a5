use chrono::NaiveDate;

use crate::models::{notification::OutboundMail, reminder::ReminderId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchWrite {
    EnqueueMail(OutboundMail),
    MarkSent { reminder_id: ReminderId, date: NaiveDate },
}

/// Writes collected over one dispatch run and applied as a single atomic unit
/// by [`ReminderStorage::commit`](crate::storage::ReminderStorage::commit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<BatchWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_mail(&mut self, mail: OutboundMail) {
        self.writes.push(BatchWrite::EnqueueMail(mail));
    }

    pub fn mark_sent(&mut self, reminder_id: ReminderId, date: NaiveDate) {
        self.writes.push(BatchWrite::MarkSent { reminder_id, date });
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[BatchWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<BatchWrite> {
        self.writes
    }
}
