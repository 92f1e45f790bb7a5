use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};

use super::{ParseError, UserId, habit::HabitId};

pub type ReminderId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryChannel {
    Email,
    Push,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Email => "email",
            DeliveryChannel::Push => "push",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryChannel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(DeliveryChannel::Email),
            "push" => Ok(DeliveryChannel::Push),
            other => Err(ParseError::InvalidChannel(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderFrequency {
    Daily,
    Weekly,
    Custom,
}

impl ReminderFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderFrequency::Daily => "daily",
            ReminderFrequency::Weekly => "weekly",
            ReminderFrequency::Custom => "custom",
        }
    }

    /// Whether `days_of_week` is consulted for this frequency.
    pub fn uses_days_of_week(&self) -> bool {
        matches!(self, ReminderFrequency::Weekly | ReminderFrequency::Custom)
    }
}

impl fmt::Display for ReminderFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderFrequency {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ReminderFrequency::Daily),
            "weekly" => Ok(ReminderFrequency::Weekly),
            "custom" => Ok(ReminderFrequency::Custom),
            other => Err(ParseError::InvalidFrequency(other.to_owned())),
        }
    }
}

/// Wall-clock time of day with minute precision. Renders as zero-padded `HH:MM`,
/// which is also the exact key reminders are matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderTime(NaiveTime);

impl ReminderTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized_time = NaiveTime::from_hms_opt(inner.hour(), inner.minute(), 0)
            .expect("Hour and minute come from a valid time.");
        Self(normalized_time)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for ReminderTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidTime(s.to_owned());

        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
        if !well_formed {
            return Err(invalid());
        }

        let hour = s[0..2].parse().map_err(|_| invalid())?;
        let minute = s[3..5].parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

/// Set of weekday indices, 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const EMPTY: DaysOfWeek = DaysOfWeek(0);

    pub fn from_indices<I>(indices: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = u8>,
    {
        indices.into_iter().try_fold(Self::EMPTY, |days, index| {
            if index > 6 {
                Err(ParseError::InvalidWeekday(index.to_string()))
            } else {
                Ok(DaysOfWeek(days.0 | 1u8 << index))
            }
        })
    }

    pub fn contains(&self, weekday: u8) -> bool {
        weekday <= 6 && self.0 & (1u8 << weekday) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=6).filter(|day| self.contains(*day))
    }
}

impl fmt::Display for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<String> = self.iter().map(|day| day.to_string()).collect();
        f.write_str(&days.join(","))
    }
}

impl FromStr for DaysOfWeek {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::EMPTY);
        }

        let indices = s
            .split(',')
            .map(|token| {
                token
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| ParseError::InvalidWeekday(token.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_indices(indices)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: ReminderId,
    pub user_id: UserId,
    /// `None` applies the reminder to all of the user's habits.
    pub habit_id: Option<HabitId>,
    pub channel: DeliveryChannel,
    pub time: ReminderTime,
    pub frequency: ReminderFrequency,
    pub days_of_week: DaysOfWeek,
    pub message_template: Option<String>,
    pub last_sent_date: Option<NaiveDate>,
    pub user_email: Option<String>,
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// Template text, with an empty template treated as absent.
    pub fn template(&self) -> Option<&str> {
        self.message_template.as_deref().filter(|text| !text.is_empty())
    }

    pub fn apply(&mut self, update: UpdateReminder, now: DateTime<Utc>) {
        let UpdateReminder {
            habit_id,
            channel,
            time,
            frequency,
            days_of_week,
            message_template,
            user_email,
            push_token,
        } = update;

        self.habit_id = habit_id.unwrap_or(self.habit_id);
        self.channel = channel.unwrap_or(self.channel);
        self.time = time.unwrap_or(self.time);
        self.frequency = frequency.unwrap_or(self.frequency);
        self.days_of_week = days_of_week.unwrap_or(self.days_of_week);
        if let Some(message_template) = message_template {
            self.message_template = message_template;
        }
        if let Some(user_email) = user_email {
            self.user_email = user_email;
        }
        if let Some(push_token) = push_token {
            self.push_token = push_token;
        }

        if !self.frequency.uses_days_of_week() {
            self.days_of_week = DaysOfWeek::EMPTY;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: UserId,
    pub habit_id: Option<HabitId>,
    pub channel: DeliveryChannel,
    pub time: ReminderTime,
    pub frequency: ReminderFrequency,
    pub days_of_week: DaysOfWeek,
    pub message_template: Option<String>,
    pub user_email: Option<String>,
    pub push_token: Option<String>,
}

impl NewReminder {
    pub fn into_reminder(self, id: ReminderId, now: DateTime<Utc>) -> Reminder {
        let days_of_week = if self.frequency.uses_days_of_week() {
            self.days_of_week
        } else {
            DaysOfWeek::EMPTY
        };

        Reminder {
            id,
            user_id: self.user_id,
            habit_id: self.habit_id,
            channel: self.channel,
            time: self.time,
            frequency: self.frequency,
            days_of_week,
            message_template: self.message_template,
            last_sent_date: None,
            user_email: self.user_email,
            push_token: self.push_token,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. Outer `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateReminder {
    pub habit_id: Option<Option<HabitId>>,
    pub channel: Option<DeliveryChannel>,
    pub time: Option<ReminderTime>,
    pub frequency: Option<ReminderFrequency>,
    pub days_of_week: Option<DaysOfWeek>,
    pub message_template: Option<Option<String>>,
    pub user_email: Option<Option<String>>,
    pub push_token: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;

    #[test]
    fn reminder_time_is_zero_padded() {
        let time = ReminderTime::from_hm(8, 5).unwrap();
        assert_eq!(time.to_string(), "08:05");
    }

    #[test]
    fn reminder_time_rejects_loose_formats() {
        for input in ["8:00", "08:0", "24:00", "12:60", "0800", "08:00:00", "ab:cd", " 8:00"] {
            assert_eq!(
                input.parse::<ReminderTime>(),
                Err(ParseError::InvalidTime(input.to_owned())),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn days_of_week_parses_stored_text() {
        let days: DaysOfWeek = "1,3,5".parse().unwrap();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert!(days.contains(3));
        assert!(!days.contains(2));
        assert_eq!(days.to_string(), "1,3,5");

        assert_eq!("".parse::<DaysOfWeek>(), Ok(DaysOfWeek::EMPTY));
        assert!("7".parse::<DaysOfWeek>().is_err());
        assert!("1,,2".parse::<DaysOfWeek>().is_err());
    }

    #[test]
    fn daily_reminders_drop_days_of_week() {
        let new_reminder = NewReminder {
            user_id: "u1".to_owned(),
            habit_id: None,
            channel: DeliveryChannel::Email,
            time: ReminderTime::from_hm(8, 0).unwrap(),
            frequency: ReminderFrequency::Daily,
            days_of_week: DaysOfWeek::from_indices([1, 2]).unwrap(),
            message_template: None,
            user_email: None,
            push_token: None,
        };

        let mut reminder = new_reminder.into_reminder(1, Utc::now());
        assert!(reminder.days_of_week.is_empty());

        reminder.apply(
            UpdateReminder {
                frequency: Some(ReminderFrequency::Custom),
                days_of_week: Some(DaysOfWeek::from_indices([0, 6]).unwrap()),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(reminder.days_of_week.iter().collect::<Vec<_>>(), vec![0, 6]);
    }

    proptest! {
        #[test]
        fn reminder_time_text_roundtrip(time in arb::<NaiveTime>()) {
            let reminder_time = ReminderTime::new(time);
            let text = reminder_time.to_string();

            prop_assert_eq!(text.len(), 5);
            prop_assert_eq!(text.parse::<ReminderTime>(), Ok(reminder_time));
        }

        #[test]
        fn days_of_week_text_roundtrip(indices in proptest::collection::vec(0u8..=6, 0..10)) {
            let days = DaysOfWeek::from_indices(indices.clone()).unwrap();
            prop_assert_eq!(days.to_string().parse::<DaysOfWeek>(), Ok(days));
            for index in indices {
                prop_assert!(days.contains(index));
            }
        }
    }
}
