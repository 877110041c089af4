use chrono::Local;
use clap::Args;
use std::path::PathBuf;

use taskmaster_core::transfer::backup_file_name;
use taskmaster_core::{ImportDocument, SyncEngine};

/// Write a JSON backup of all data
#[derive(Args)]
pub struct ExportCommand {
    /// Output file, defaults to taskmaster-backup-<date>.json; `-` prints to stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl ExportCommand {
    pub fn run(&self, engine: &SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        let json = engine.export_all().to_json()?;

        let path = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(backup_file_name(Local::now().date_naive())));
        if path.as_os_str() == "-" {
            println!("{}", json);
            return Ok(());
        }

        std::fs::write(&path, json)?;
        println!("Exported to {}", path.display());
        Ok(())
    }
}

/// Replace data with the contents of a backup
#[derive(Args)]
pub struct ImportCommand {
    /// Backup file to read
    file: PathBuf,
}

impl ImportCommand {
    pub fn run(&self, engine: &mut SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(&self.file)?;
        let doc = ImportDocument::parse(&contents)?;

        let sections = [
            ("todos", doc.todos.as_ref().map(Vec::len)),
            ("reminders", doc.reminders.as_ref().map(Vec::len)),
            ("notes", doc.notes.as_ref().map(Vec::len)),
        ];
        engine.import_all(doc);

        println!("Imported {}", self.file.display());
        for (name, count) in sections {
            if let Some(count) = count {
                println!("  {}: {}", name, count);
            }
        }
        Ok(())
    }
}
