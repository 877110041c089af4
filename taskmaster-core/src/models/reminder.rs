use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatInterval {
    Daily,
    Weekly,
    Monthly,
}

impl RepeatInterval {
    /// Returns `time` advanced by one interval. Monthly steps follow the
    /// calendar and clamp to the last day of shorter months.
    pub fn advance(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RepeatInterval::Daily => time + Duration::days(1),
            RepeatInterval::Weekly => time + Duration::days(7),
            RepeatInterval::Monthly => time
                .checked_add_months(Months::new(1))
                .unwrap_or(time + Duration::days(30)),
        }
    }
}

impl fmt::Display for RepeatInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatInterval::Daily => write!(f, "daily"),
            RepeatInterval::Weekly => write!(f, "weekly"),
            RepeatInterval::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for RepeatInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RepeatInterval::Daily),
            "weekly" => Ok(RepeatInterval::Weekly),
            "monthly" => Ok(RepeatInterval::Monthly),
            _ => Err(format!(
                "Invalid interval '{}'. Valid options: daily, weekly, monthly",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: EntityId,
    pub text: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub interval: Option<RepeatInterval>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Reminder {
    pub fn new(text: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::generate(),
            text: text.into(),
            time,
            repeat: false,
            interval: None,
            active: true,
        }
    }

    pub fn repeating(mut self, interval: RepeatInterval) -> Self {
        self.repeat = true;
        self.interval = Some(interval);
        self
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.active && now >= self.time
    }

    /// Applies a trigger: repeating reminders move forward by one interval
    /// from their previous trigger time, one-shot reminders are deactivated.
    pub fn fire(&mut self) {
        match (self.repeat, self.interval) {
            (true, Some(interval)) => self.time = interval.advance(self.time),
            _ => self.active = false,
        }
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.text, self.time.format("%Y-%m-%d %H:%M"))?;
        if let Some(interval) = self.interval.filter(|_| self.repeat) {
            write!(f, " (repeats {})", interval)?;
        }
        if !self.active {
            write!(f, " [done]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_daily_reminder_advances_and_stays_active() {
        let t = at(2025, 3, 10, 9);
        let mut reminder = Reminder::new("Stand-up", t).repeating(RepeatInterval::Daily);

        reminder.fire();

        assert_eq!(reminder.time, t + Duration::hours(24));
        assert!(reminder.active);
    }

    #[test]
    fn test_one_shot_reminder_deactivates_without_moving() {
        let t = at(2025, 3, 10, 9);
        let mut reminder = Reminder::new("Call mum", t);

        reminder.fire();

        assert_eq!(reminder.time, t);
        assert!(!reminder.active);
        assert!(!reminder.is_due(t + Duration::hours(1)));
    }

    #[test]
    fn test_weekly_and_monthly_advance() {
        let t = at(2025, 1, 31, 8);
        assert_eq!(RepeatInterval::Weekly.advance(t), at(2025, 2, 7, 8));
        assert_eq!(RepeatInterval::Monthly.advance(t), at(2025, 2, 28, 8));
    }

    #[test]
    fn test_is_due() {
        let t = at(2025, 3, 10, 9);
        let reminder = Reminder::new("x", t);
        assert!(!reminder.is_due(t - Duration::minutes(1)));
        assert!(reminder.is_due(t));
    }

    #[test]
    fn test_repeat_without_interval_behaves_as_one_shot() {
        let t = at(2025, 3, 10, 9);
        let mut reminder = Reminder::new("x", t);
        reminder.repeat = true;

        reminder.fire();

        assert!(!reminder.active);
    }

    #[test]
    fn test_deserialize_null_interval() {
        let json = r#"{"id":"1","text":"t","time":"2025-03-10T09:00:00.000Z","repeat":false,"interval":null,"active":true}"#;
        let reminder: Reminder = serde_json::from_str(json).unwrap();
        assert_eq!(reminder.interval, None);
        assert!(reminder.active);
    }
}
