use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    AppContext, AuthCommand, ConfigCommand, ExportCommand, ImportCommand, NoteCommand,
    PomodoroCommand, ReminderCommand, SettingsCommand, StatsCommand, SyncCommand, TaskCommand,
};
use config::Config;
use taskmaster_core::SyncEngine;

#[derive(Parser)]
#[command(name = "taskmaster")]
#[command(version)]
#[command(about = "Tasks, reminders, notes and pomodoros, synced across devices", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tasks
    Task(TaskCommand),

    /// Manage reminders
    Reminder(ReminderCommand),

    /// Manage notes
    Note(NoteCommand),

    /// Show or reset statistics
    Stats(StatsCommand),

    /// Record pomodoro sessions
    Pomodoro(PomodoroCommand),

    /// Show or change widget settings
    Settings(SettingsCommand),

    /// Write a JSON backup
    Export(ExportCommand),

    /// Restore from a JSON backup
    Import(ImportCommand),

    /// Sign in, sign out or show the account
    Auth(AuthCommand),

    /// Inspect or follow synchronization
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskmaster=warn,taskmaster_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    // Config commands never touch the store or the network
    if let Commands::Config(cmd) = &command {
        return cmd.run(&config, cli_config_path);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute_command(command, &config))
}

async fn execute_command(
    command: Commands,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = AppContext::open(config);

    match command {
        Commands::Auth(cmd) => {
            let result = cmd.run(&mut ctx).await;
            ctx.finish().await;
            result
        }
        Commands::Sync(cmd) => cmd.run(ctx, config).await,
        command => {
            if config.sync.auto_sync.value {
                ctx.connect().await;
            }
            let result = execute_data_command(&command, &mut ctx.engine);
            ctx.finish().await;
            result
        }
    }
}

fn execute_data_command(
    command: &Commands,
    engine: &mut SyncEngine,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Task(cmd) => cmd.run(engine),
        Commands::Reminder(cmd) => cmd.run(engine),
        Commands::Note(cmd) => cmd.run(engine),
        Commands::Stats(cmd) => cmd.run(engine),
        Commands::Pomodoro(cmd) => cmd.run(engine),
        Commands::Settings(cmd) => cmd.run(engine),
        Commands::Export(cmd) => cmd.run(engine),
        Commands::Import(cmd) => cmd.run(engine),
        Commands::Auth(_) | Commands::Sync(_) | Commands::Config(_) => Ok(()),
    }
}
