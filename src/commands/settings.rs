use clap::{Args, Subcommand};

use taskmaster_core::SyncEngine;

use super::OutputFormat;

#[derive(Args)]
pub struct SettingsCommand {
    #[command(subcommand)]
    pub command: SettingsSubcommand,
}

#[derive(Subcommand)]
pub enum SettingsSubcommand {
    /// Show widget settings
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change a setting (e.g. `theme light`, `workDuration 50`)
    Set { key: String, value: String },
}

impl SettingsCommand {
    pub fn run(&self, engine: &mut SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SettingsSubcommand::Show { format } => {
                let settings = &engine.state().settings;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(settings)?)
                    }
                    OutputFormat::Text => {
                        println!("theme:                  {}", settings.theme);
                        println!("palette:                {}", settings.palette);
                        println!("opacity:                {}", settings.opacity);
                        println!("blur:                   {}", settings.blur);
                        println!("soundEnabled:           {}", settings.sound_enabled);
                        println!("animationsEnabled:      {}", settings.animations_enabled);
                        println!("alwaysOnTop:            {}", settings.always_on_top);
                        println!(
                            "categoryFiltersVisible: {}",
                            settings.category_filters_visible
                        );
                        println!("workDuration:           {}", settings.work_duration);
                        println!("shortBreak:             {}", settings.short_break);
                        println!("longBreak:              {}", settings.long_break);
                    }
                }
                Ok(())
            }
            SettingsSubcommand::Set { key, value } => {
                engine.set_setting(key, value)?;
                println!("Updated {}", key);
                Ok(())
            }
        }
    }
}
