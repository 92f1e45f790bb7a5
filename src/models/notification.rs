use chrono::{DateTime, Utc};

pub const DEFAULT_MAIL_SUBJECT: &str = "Streak Master Reminder";
pub const DEFAULT_MAIL_BODY: &str = "Don't break the chain!";
pub const PUSH_TITLE: &str = "Habit Reminder";
pub const DEFAULT_PUSH_BODY: &str = "Don't forget your streak!";

pub type MailId = i64;

/// Outbound email record, picked up by whatever relays the mail collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl OutboundMail {
    /// Subject is the first line of the template.
    pub fn from_template(to: impl Into<String>, template: Option<&str>) -> Self {
        let (subject, text) = match template {
            Some(template) => (
                template.lines().next().unwrap_or_default().to_owned(),
                template.to_owned(),
            ),
            None => (DEFAULT_MAIL_SUBJECT.to_owned(), DEFAULT_MAIL_BODY.to_owned()),
        };

        Self {
            to: to.into(),
            subject,
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMail {
    pub id: MailId,
    pub mail: OutboundMail,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

impl PushNotification {
    pub fn from_template(template: Option<&str>) -> Self {
        Self {
            title: PUSH_TITLE.to_owned(),
            body: template.unwrap_or(DEFAULT_PUSH_BODY).to_owned(),
        }
    }
}
