use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use super::{ParseError, UserId};

pub type HabitId = i64;

/// Streak lengths, in days, that award a badge.
pub const MILESTONES: [u32; 9] = [3, 7, 14, 21, 30, 60, 90, 180, 365];

pub const HEATMAP_WINDOW_DAYS: u32 = 30;
pub const HEATMAP_LOG_LIMIT: usize = 30;
const HEATMAP_MAX_LEVEL: u32 = 4;

pub fn is_milestone(streak: u32) -> bool {
    MILESTONES.contains(&streak)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HabitValidationError {
    #[error("Habit name must not be empty")]
    EmptyName,

    #[error("Habit target duration must be at least one day")]
    ZeroDuration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    pub name: String,
    pub duration_days: u32,
    pub streak: u32,
    pub badges: BTreeSet<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitProgress {
    pub percent: u8,
    pub goal_met: bool,
}

impl Habit {
    pub fn progress(&self) -> HabitProgress {
        let percent = if self.duration_days == 0 {
            0
        } else {
            let ratio = f64::from(self.streak) / f64::from(self.duration_days) * 100.0;
            ratio.round().min(100.0) as u8
        };

        HabitProgress {
            percent,
            goal_met: self.streak >= self.duration_days,
        }
    }

    /// Bumps the streak and returns the badge earned by it, if any.
    pub fn record_increment(&mut self, now: DateTime<Utc>) -> Option<u32> {
        self.streak += 1;
        self.updated_at = now;

        if is_milestone(self.streak) && self.badges.insert(self.streak) {
            Some(self.streak)
        } else {
            None
        }
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.streak = 0;
        self.updated_at = now;
    }

    pub fn apply(
        &mut self,
        edit: EditHabit,
        now: DateTime<Utc>,
    ) -> Result<(), HabitValidationError> {
        let (name, duration_days) = validate(&edit.name, edit.duration_days)?;
        self.name = name;
        self.duration_days = duration_days;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub user_id: UserId,
    pub name: String,
    pub duration_days: u32,
}

impl NewHabit {
    pub fn into_habit(
        self,
        id: HabitId,
        now: DateTime<Utc>,
    ) -> Result<Habit, HabitValidationError> {
        let (name, duration_days) = validate(&self.name, self.duration_days)?;

        Ok(Habit {
            id,
            user_id: self.user_id,
            name,
            duration_days,
            streak: 0,
            badges: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EditHabit {
    pub name: String,
    pub duration_days: u32,
}

fn validate(name: &str, duration_days: u32) -> Result<(String, u32), HabitValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HabitValidationError::EmptyName);
    }
    if duration_days == 0 {
        return Err(HabitValidationError::ZeroDuration);
    }
    Ok((name.to_owned(), duration_days))
}

pub fn badges_to_string(badges: &BTreeSet<u32>) -> String {
    badges
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_badges(s: &str) -> Result<BTreeSet<u32>, ParseError> {
    if s.trim().is_empty() {
        return Ok(BTreeSet::new());
    }

    s.split(',')
        .map(|token| {
            token
                .trim()
                .parse::<u32>()
                .map_err(|_| ParseError::InvalidBadges(s.to_owned()))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub count: u32,
}

impl HeatmapCell {
    /// Colour bucket, 0 for an empty day up to 4.
    pub fn level(&self) -> u32 {
        self.count.min(HEATMAP_MAX_LEVEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heatmap {
    pub cells: Vec<HeatmapCell>,
}

impl Heatmap {
    /// Counts log entries per local calendar day over the window of
    /// `window_days` ending at `end_date` (inclusive). Entries outside the
    /// window are dropped.
    pub fn build(
        logs: &[DateTime<Utc>],
        end_date: NaiveDate,
        window_days: u32,
        timezone: Tz,
    ) -> Self {
        let start_date = end_date - TimeDelta::days(i64::from(window_days.max(1)) - 1);

        let mut counts = BTreeMap::<NaiveDate, u32>::new();
        for logged_at in logs {
            let day = logged_at.with_timezone(&timezone).date_naive();
            if (start_date..=end_date).contains(&day) {
                *counts.entry(day).or_default() += 1;
            }
        }

        let cells = start_date
            .iter_days()
            .take_while(|day| *day <= end_date)
            .map(|date| HeatmapCell {
                date,
                count: counts.get(&date).copied().unwrap_or_default(),
            })
            .collect();

        Self { cells }
    }

    pub fn total(&self) -> u32 {
        self.cells.iter().map(|cell| cell.count).sum()
    }
}
