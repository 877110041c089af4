//! Sync CLI commands.

use clap::{Args, Subcommand};

use taskmaster_core::local_store::keys;
use taskmaster_core::{check_server, Change, LocalStore, StatusKind};

use super::AppContext;
use crate::config::Config;

/// Inspect or follow synchronization with the server
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    pub command: SyncSubcommand,
}

#[derive(Subcommand)]
pub enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,
    /// Stay connected and print changes until interrupted
    Watch,
}

impl SyncCommand {
    pub async fn run(
        &self,
        ctx: AppContext,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SyncSubcommand::Status => {
                status(&ctx, config).await;
                Ok(())
            }
            SyncSubcommand::Watch => watch(ctx).await,
        }
    }
}

async fn status(ctx: &AppContext, config: &Config) {
    let server_url = &config.sync.server_url.value;
    let store = LocalStore::new(config.data_dir.value.clone());

    println!("Sync Status");
    println!("===========");
    println!();
    println!("Server:    {}", server_url);
    println!(
        "Auto-sync: {}",
        if config.sync.auto_sync.value {
            "enabled"
        } else {
            "disabled"
        }
    );

    match ctx.sessions.current() {
        Some(session) => println!("Account:   {}", session.label()),
        None => println!("Account:   not signed in"),
    }
    println!(
        "Uploaded:  {}",
        if store.flag(keys::MIGRATED_TO_REMOTE) {
            "yes"
        } else {
            "no (local data is uploaded on first sign-in)"
        }
    );
    println!();

    print!("Server status: ");
    match check_server(server_url).await {
        Ok(()) => println!("✓ reachable"),
        Err(e) => println!("✗ {}", e),
    }
}

async fn watch(ctx: AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let AppContext {
        mut engine,
        sessions,
        status,
    } = ctx;

    if sessions.current().is_none() {
        println!("Not signed in; watching local reminders only.");
    }

    engine.on_change(|change, state| match change {
        Change::Tasks => println!("Tasks updated ({} total)", state.tasks.len()),
        Change::Reminders => println!("Reminders updated ({} total)", state.reminders.len()),
        Change::Notes => println!("Notes updated ({} total)", state.notes.len()),
        Change::Stats => println!(
            "Stats: {} of {} tasks completed, {} pomodoros",
            state.stats.completed_tasks, state.stats.total_tasks, state.stats.total_pomodoros
        ),
        Change::ReminderDue(reminder) => println!("Reminder: {}", reminder.text),
        Change::Settings | Change::Reloaded | Change::Phase(_) => {}
    });

    let mut status_rx = status.subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let current = status_rx.borrow_and_update().clone();
            if let Some(status) = current {
                let mark = match status.kind {
                    StatusKind::Syncing => "…",
                    StatusKind::Success => "✓",
                    StatusKind::Error => "✗",
                };
                println!("{} {}", mark, status.message);
            }
        }
    });

    println!("Watching for changes. Press Ctrl-C to stop.");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    engine.run(sessions.subscribe(), shutdown).await;
    Ok(())
}
