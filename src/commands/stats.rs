use clap::{Args, Subcommand};

use taskmaster_core::SyncEngine;

use super::OutputFormat;

#[derive(Args)]
pub struct StatsCommand {
    #[command(subcommand)]
    pub command: StatsSubcommand,
}

#[derive(Subcommand)]
pub enum StatsSubcommand {
    /// Show productivity counters
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Recount tasks and zero the pomodoro counters
    Reset,
}

impl StatsCommand {
    pub fn run(&self, engine: &mut SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            StatsSubcommand::Show { format } => {
                let stats = engine.state().stats;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                    OutputFormat::Text => {
                        println!("Tasks:        {}", stats.total_tasks);
                        println!("Completed:    {}", stats.completed_tasks);
                        println!("Productivity: {}%", stats.productivity());
                        println!("Pomodoros:    {}", stats.total_pomodoros);
                        println!("Focus time:   {} min", stats.total_minutes);
                    }
                }
                Ok(())
            }
            StatsSubcommand::Reset => {
                engine.reset_stats();
                println!("Statistics reset");
                Ok(())
            }
        }
    }
}

#[derive(Args)]
pub struct PomodoroCommand {
    #[command(subcommand)]
    pub command: PomodoroSubcommand,
}

#[derive(Subcommand)]
pub enum PomodoroSubcommand {
    /// Record a finished work session
    Complete {
        /// Session length in minutes, defaults to the configured work duration
        #[arg(long, short)]
        minutes: Option<u32>,
    },
}

impl PomodoroCommand {
    pub fn run(&self, engine: &mut SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PomodoroSubcommand::Complete { minutes } => {
                let minutes = minutes.unwrap_or(engine.state().settings.work_duration);
                if minutes == 0 {
                    return Err("Session length must be at least one minute".into());
                }
                engine.record_pomodoro(minutes);
                println!(
                    "Recorded a {} minute session ({} total)",
                    minutes,
                    engine.state().stats.total_pomodoros
                );
                Ok(())
            }
        }
    }
}
