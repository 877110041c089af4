use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use clap::{Args, Subcommand};

use taskmaster_core::{RepeatInterval, SyncEngine};

use super::{resolve_id, short_id, OutputFormat};

#[derive(Args)]
pub struct ReminderCommand {
    #[command(subcommand)]
    pub command: ReminderSubcommand,
}

#[derive(Subcommand)]
pub enum ReminderSubcommand {
    /// Add a reminder
    Add {
        /// Reminder text
        #[arg(required = true)]
        text: Vec<String>,

        /// When to fire: "YYYY-MM-DD HH:MM" or "HH:MM" (next occurrence), local time
        #[arg(long, short)]
        at: String,

        /// Repeat interval (daily, weekly, monthly)
        #[arg(long, short)]
        repeat: Option<String>,
    },

    /// List reminders
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a reminder
    Rm {
        /// List position or id prefix
        reminder: String,
    },

    /// Fire reminders that are due now
    Check,
}

impl ReminderCommand {
    pub fn run(&self, engine: &mut SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ReminderSubcommand::Add { text, at, repeat } => {
                let time = parse_time(at, Local::now())?;
                let repeat: Option<RepeatInterval> =
                    repeat.as_deref().map(str::parse::<RepeatInterval>).transpose()?;

                match engine.add_reminder(&text.join(" "), time, repeat) {
                    Some(id) => println!(
                        "Added reminder {} for {}",
                        short_id(id.as_str()),
                        time.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    ),
                    None => return Err("Reminder text cannot be empty".into()),
                }
                Ok(())
            }
            ReminderSubcommand::List { format } => {
                let reminders = &engine.state().reminders;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(reminders)?);
                    }
                    OutputFormat::Text => {
                        if reminders.is_empty() {
                            println!("No reminders.");
                        }
                        for (i, reminder) in reminders.iter().enumerate() {
                            println!(
                                "{:>3}. {}  {}",
                                i + 1,
                                reminder,
                                short_id(reminder.id.as_str())
                            );
                        }
                    }
                }
                Ok(())
            }
            ReminderSubcommand::Rm { reminder } => {
                let reminders = &engine.state().reminders;
                let id = resolve_id(
                    reminders.iter().map(|r| r.id.as_str()),
                    reminder,
                    "reminder",
                )?;
                engine.delete_reminder(&id);
                println!("Deleted reminder {}", short_id(&id));
                Ok(())
            }
            ReminderSubcommand::Check => {
                let fired = engine.check_reminders(Utc::now());
                if fired.is_empty() {
                    println!("No reminders due.");
                }
                for reminder in fired {
                    println!("Reminder: {}", reminder.text);
                }
                Ok(())
            }
        }
    }
}

/// Parses a local date-time, or a bare time meaning its next occurrence
/// after `now`.
fn parse_time(value: &str, now: DateTime<Local>) -> Result<DateTime<Utc>, String> {
    let invalid = || {
        format!(
            "Invalid time '{}'. Use \"YYYY-MM-DD HH:MM\" or \"HH:MM\".",
            value
        )
    };

    let naive = match NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M") {
        Ok(naive) => naive,
        Err(_) => {
            let time = NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| invalid())?;
            let today = now.date_naive().and_time(time);
            if today > now.naive_local() {
                today
            } else {
                today + Duration::days(1)
            }
        }
    };

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).earliest().unwrap()
    }

    #[test]
    fn test_parse_full_date_time() {
        let now = local(2024, 1, 10, 12, 0);
        let parsed = parse_time("2024-01-11 09:30", now).unwrap();
        assert_eq!(parsed, local(2024, 1, 11, 9, 30).with_timezone(&Utc));
    }

    #[test]
    fn test_bare_time_picks_next_occurrence() {
        let now = local(2024, 1, 10, 12, 0);
        assert_eq!(
            parse_time("18:00", now).unwrap(),
            local(2024, 1, 10, 18, 0).with_timezone(&Utc)
        );
        assert_eq!(
            parse_time("08:00", now).unwrap(),
            local(2024, 1, 11, 8, 0).with_timezone(&Utc)
        );
    }

    #[test]
    fn test_invalid_time() {
        let now = local(2024, 1, 10, 12, 0);
        assert!(parse_time("tomorrow", now).unwrap_err().contains("Invalid time"));
    }
}
