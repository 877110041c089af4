mod auth;
mod config_cmd;
mod note;
mod reminder;
mod settings;
mod stats;
mod sync_cmd;
mod task;
mod transfer;

pub use auth::AuthCommand;
pub use config_cmd::ConfigCommand;
pub use note::NoteCommand;
pub use reminder::ReminderCommand;
pub use settings::SettingsCommand;
pub use stats::{PomodoroCommand, StatsCommand};
pub use sync_cmd::SyncCommand;
pub use task::TaskCommand;
pub use transfer::{ExportCommand, ImportCommand};

use clap::ValueEnum;
use std::sync::Arc;
use std::time::Duration;

use taskmaster_core::{
    HttpIdentityProvider, HttpRemoteStore, LocalStore, SessionManager, StatusKind,
    StatusReporter, SyncEngine,
};

use crate::config::Config;

/// How long data commands wait for the server's first snapshots.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Engine and session wiring shared by the commands.
pub struct AppContext {
    pub engine: SyncEngine,
    pub sessions: SessionManager,
    pub status: StatusReporter,
}

impl AppContext {
    pub fn open(config: &Config) -> Self {
        let store = LocalStore::new(config.data_dir.value.clone());
        let status = StatusReporter::new();
        let server_url = config.sync.server_url.value.as_str();

        let sessions = SessionManager::new(
            Arc::new(HttpIdentityProvider::new(server_url)),
            store.clone(),
            status.clone(),
        );
        let engine = SyncEngine::new(
            store,
            Arc::new(HttpRemoteStore::new(server_url)),
            status.clone(),
        );

        Self {
            engine,
            sessions,
            status,
        }
    }

    /// Starts syncing the current session, if any, and waits for the
    /// server's snapshots. Returns whether remote data was received.
    pub async fn connect(&mut self) -> bool {
        let Some(session) = self.sessions.current() else {
            return false;
        };
        if !session.sync_enabled {
            return false;
        }

        self.engine.handle_session(Some(session)).await;
        if self.engine.wait_for_initial_snapshots(CONNECT_TIMEOUT).await {
            true
        } else {
            eprintln!("Warning: sync server did not answer, showing local data");
            false
        }
    }

    /// Saves pending edits, waits for remote writes and disconnects.
    pub async fn finish(mut self) {
        self.engine.flush_autosave();
        self.engine.flush().await;
        self.engine.stop_sync();

        if let Some(status) = self.status.current() {
            if status.kind == StatusKind::Error {
                eprintln!("Warning: {}", status.message);
            }
        }
    }
}

/// Resolves a 1-based list position or a unique id prefix to an id.
pub fn resolve_id<'a>(
    ids: impl IntoIterator<Item = &'a str>,
    reference: &str,
    what: &str,
) -> Result<String, String> {
    let ids: Vec<&str> = ids.into_iter().collect();

    if let Ok(position) = reference.parse::<usize>() {
        if position >= 1 && position <= ids.len() {
            return Ok(ids[position - 1].to_string());
        }
    }

    let matches: Vec<&str> = ids
        .iter()
        .copied()
        .filter(|id| id.starts_with(reference))
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(format!("No {} matches '{}'", what, reference)),
        _ => Err(format!(
            "'{}' matches several {}s; use more characters",
            reference, what
        )),
    }
}

/// First characters of an id, enough to tell entries apart in listings.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 3] = ["abc123", "abd456", "xyz789"];

    #[test]
    fn test_resolve_by_position() {
        assert_eq!(resolve_id(IDS, "2", "task").unwrap(), "abd456");
    }

    #[test]
    fn test_resolve_by_prefix() {
        assert_eq!(resolve_id(IDS, "xy", "task").unwrap(), "xyz789");
    }

    #[test]
    fn test_resolve_ambiguous_or_missing() {
        assert!(resolve_id(IDS, "ab", "task")
            .unwrap_err()
            .contains("several"));
        assert!(resolve_id(IDS, "q", "task")
            .unwrap_err()
            .contains("No task"));
        assert!(resolve_id(IDS, "9", "task").is_err());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
