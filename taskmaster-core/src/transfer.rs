//! JSON backup format.
//!
//! An export carries every collection plus the appearance settings. On
//! import each section is optional and only the sections present replace
//! current state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::AppState;
use crate::models::{Note, Reminder, Settings, Stats, Task, Theme};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Not a valid backup file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Appearance settings included in backups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedSettings {
    pub theme: Theme,
    pub palette: String,
    pub opacity: u8,
    pub blur: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub todos: Vec<Task>,
    pub reminders: Vec<Reminder>,
    pub notes: Vec<Note>,
    pub stats: Stats,
    pub settings: ExportedSettings,
    pub export_date: DateTime<Utc>,
}

impl ExportDocument {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            todos: state.tasks.clone(),
            reminders: state.reminders.clone(),
            notes: state.notes.clone(),
            stats: state.stats,
            settings: ExportedSettings {
                theme: state.settings.theme,
                palette: state.settings.palette.clone(),
                opacity: state.settings.opacity,
                blur: state.settings.blur,
            },
            export_date: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Suggested file name for a backup taken on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("taskmaster-backup-{}.json", date)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportedSettings {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub palette: Option<String>,
    #[serde(default)]
    pub opacity: Option<u8>,
    #[serde(default)]
    pub blur: Option<u8>,
}

impl ImportedSettings {
    /// Applies the appearance fields. Anything but "dark" selects the light
    /// theme; blank or zero values fall back to the defaults.
    pub fn apply(&self, settings: &mut Settings) {
        let defaults = Settings::default();
        settings.theme = match self.theme.as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        };
        settings.palette = self
            .palette
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.palette);
        settings.opacity = self
            .opacity
            .filter(|o| *o > 0)
            .unwrap_or(defaults.opacity);
        settings.blur = self.blur.unwrap_or(defaults.blur);
    }
}

/// A parsed backup. Absent sections are `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportDocument {
    #[serde(default)]
    pub todos: Option<Vec<Task>>,
    #[serde(default)]
    pub reminders: Option<Vec<Reminder>>,
    #[serde(default)]
    pub notes: Option<Vec<Note>>,
    #[serde(default)]
    pub stats: Option<Stats>,
    #[serde(default)]
    pub settings: Option<ImportedSettings>,
}

impl ImportDocument {
    /// Parses a backup. Fails without side effects on malformed input.
    pub fn parse(json: &str) -> Result<Self, TransferError> {
        Ok(serde_json::from_str(json)?)
    }
}
