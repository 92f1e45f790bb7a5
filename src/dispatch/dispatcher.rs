use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::{
    clock::LocalSlot,
    delivery::PushSender,
    models::{
        notification::{OutboundMail, PushNotification},
        reminder::{DeliveryChannel, Reminder, ReminderId},
    },
    storage::{ReminderStorage, StorageError},
};

use super::{WriteBatch, eligibility::is_due, ticker::TickHandler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub slot: LocalSlot,
    /// Reminders whose time matched the slot, before eligibility checks.
    pub candidates: usize,
    pub dispatched: Vec<ReminderId>,
    pub mails_enqueued: usize,
    pub pushes_delivered: usize,
    pub push_failures: usize,
    pub skipped_missing_contact: usize,
}

impl DispatchReport {
    fn new(slot: LocalSlot) -> Self {
        Self {
            slot,
            candidates: 0,
            dispatched: Vec::new(),
            mails_enqueued: 0,
            pushes_delivered: 0,
            push_failures: 0,
            skipped_missing_contact: 0,
        }
    }
}

enum Delivery {
    Mail(OutboundMail),
    Push {
        device_token: String,
        notification: PushNotification,
    },
}

fn plan_delivery(reminder: &Reminder) -> Option<Delivery> {
    match reminder.channel {
        DeliveryChannel::Email => reminder
            .user_email
            .as_deref()
            .filter(|email| !email.is_empty())
            .map(|email| Delivery::Mail(OutboundMail::from_template(email, reminder.template()))),
        DeliveryChannel::Push => reminder
            .push_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| Delivery::Push {
                device_token: token.to_owned(),
                notification: PushNotification::from_template(reminder.template()),
            }),
    }
}

/// One pass over the reminders due in a time slot.
///
/// Mail and "sent today" marks go into a single [`WriteBatch`]. Push sends run
/// as detached tasks: their outcome is logged but never affects the marks, and
/// a failing commit does not cancel them.
pub struct ReminderDispatcher {
    storage: Arc<dyn ReminderStorage>,
    push: Arc<dyn PushSender>,
    timezone: Tz,
}

impl ReminderDispatcher {
    pub fn new(storage: Arc<dyn ReminderStorage>, push: Arc<dyn PushSender>, timezone: Tz) -> Self {
        Self {
            storage,
            push,
            timezone,
        }
    }

    pub async fn dispatch_at(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<DispatchReport, StorageError> {
        self.dispatch_slot(LocalSlot::at(instant, self.timezone))
            .await
    }

    pub async fn dispatch_slot(&self, slot: LocalSlot) -> Result<DispatchReport, StorageError> {
        let mut report = DispatchReport::new(slot);
        log::info!("Checking reminders for {}", slot.time);

        let candidates = self.storage.get_due_at(&slot.time).await?;
        report.candidates = candidates.len();
        if candidates.is_empty() {
            log::info!("No reminders due at {}", slot.time);
            return Ok(report);
        }

        let mut batch = WriteBatch::new();
        let mut pushes = Vec::new();

        for reminder in candidates.iter().filter(|reminder| is_due(reminder, &slot)) {
            log::info!(
                "Dispatching reminder. [id = {}, channel = {}, frequency = {}, days = {}]",
                reminder.id,
                reminder.channel,
                reminder.frequency,
                reminder.days_of_week
            );

            match plan_delivery(reminder) {
                Some(Delivery::Mail(mail)) => {
                    batch.enqueue_mail(mail);
                    report.mails_enqueued += 1;
                }
                Some(Delivery::Push {
                    device_token,
                    notification,
                }) => {
                    pushes.push(self.spawn_push(reminder.id, device_token, notification));
                }
                None => {
                    log::debug!(
                        "Reminder {} has no {} contact, skipping",
                        reminder.id,
                        reminder.channel
                    );
                    report.skipped_missing_contact += 1;
                    continue;
                }
            }

            batch.mark_sent(reminder.id, slot.date);
            report.dispatched.push(reminder.id);
        }

        if !batch.is_empty() {
            self.storage.commit(batch).await?;
        }

        for push in pushes {
            match push.await {
                Ok(true) => report.pushes_delivered += 1,
                Ok(false) => report.push_failures += 1,
                Err(e) => {
                    log::error!("Push task panicked: {e}");
                    report.push_failures += 1;
                }
            }
        }

        log::info!(
            "Processed reminders at {}. [dispatched = {}, mails = {}, pushes = {}, push_failures = {}]",
            slot.time,
            report.dispatched.len(),
            report.mails_enqueued,
            report.pushes_delivered,
            report.push_failures
        );

        Ok(report)
    }

    fn spawn_push(
        &self,
        reminder_id: ReminderId,
        device_token: String,
        notification: PushNotification,
    ) -> JoinHandle<bool> {
        let push = Arc::clone(&self.push);
        tokio::spawn(async move {
            match push.send(&device_token, &notification).await {
                Ok(()) => true,
                Err(e) => {
                    log::error!(
                        "Push delivery failed. [reminder_id = {reminder_id}, error = {e:#}]"
                    );
                    false
                }
            }
        })
    }
}

#[async_trait]
impl TickHandler for ReminderDispatcher {
    async fn on_tick(&self, tick: DateTime<Utc>) -> anyhow::Result<()> {
        self.dispatch_at(tick).await?;
        Ok(())
    }
}
