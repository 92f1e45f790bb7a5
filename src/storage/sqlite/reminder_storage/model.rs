use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    ParseError,
    notification::{OutboundMail, QueuedMail},
    reminder::Reminder,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReminderStorageModel {
    pub id: i64,
    pub user_id: String,
    pub habit_id: Option<i64>,
    pub channel: String,
    pub time: String,
    pub frequency: String,
    pub days_of_week: String,
    pub message_template: Option<String>,
    pub last_sent_date: Option<NaiveDate>,
    pub user_email: Option<String>,
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reminder> for ReminderStorageModel {
    fn from(value: Reminder) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            habit_id: value.habit_id,
            channel: value.channel.as_str().to_owned(),
            time: value.time.to_string(),
            frequency: value.frequency.as_str().to_owned(),
            days_of_week: value.days_of_week.to_string(),
            message_template: value.message_template,
            last_sent_date: value.last_sent_date,
            user_email: value.user_email,
            push_token: value.push_token,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<ReminderStorageModel> for Reminder {
    type Error = ParseError;

    fn try_from(value: ReminderStorageModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            user_id: value.user_id,
            habit_id: value.habit_id,
            channel: value.channel.parse()?,
            time: value.time.parse()?,
            frequency: value.frequency.parse()?,
            days_of_week: value.days_of_week.parse()?,
            message_template: value.message_template,
            last_sent_date: value.last_sent_date,
            user_email: value.user_email,
            push_token: value.push_token,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// Converts rows, dropping the ones that fail validation.
pub fn valid_reminders(rows: Vec<ReminderStorageModel>) -> Vec<Reminder> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            Reminder::try_from(row)
                .inspect_err(|e| {
                    log::warn!("Skipping invalid reminder record. [id = {id}, error = {e}]")
                })
                .ok()
        })
        .collect()
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MailStorageModel {
    pub id: i64,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<MailStorageModel> for QueuedMail {
    fn from(value: MailStorageModel) -> Self {
        Self {
            id: value.id,
            mail: OutboundMail {
                to: value.recipient,
                subject: value.subject,
                text: value.body,
            },
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reminder::{DaysOfWeek, DeliveryChannel, ReminderFrequency, ReminderTime};

    fn row() -> ReminderStorageModel {
        ReminderStorageModel {
            id: 7,
            user_id: "u1".to_owned(),
            habit_id: Some(3),
            channel: "push".to_owned(),
            time: "08:00".to_owned(),
            frequency: "custom".to_owned(),
            days_of_week: "1,3,5".to_owned(),
            message_template: Some("Go".to_owned()),
            last_sent_date: None,
            user_email: None,
            push_token: Some("tok1".to_owned()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_is_validated_into_reminder() {
        let reminder = Reminder::try_from(row()).unwrap();

        assert_eq!(reminder.channel, DeliveryChannel::Push);
        assert_eq!(reminder.frequency, ReminderFrequency::Custom);
        assert_eq!(reminder.time, ReminderTime::from_hm(8, 0).unwrap());
        assert_eq!(reminder.days_of_week, DaysOfWeek::from_indices([1, 3, 5]).unwrap());
    }

    #[test]
    fn invalid_rows_are_dropped() {
        let bad_time = ReminderStorageModel {
            id: 8,
            time: "8am".to_owned(),
            ..row()
        };
        let bad_channel = ReminderStorageModel {
            id: 9,
            channel: "sms".to_owned(),
            ..row()
        };

        let reminders = valid_reminders(vec![row(), bad_time, bad_channel]);

        assert_eq!(reminders.iter().map(|r| r.id).collect::<Vec<_>>(), vec![7]);
    }
}
