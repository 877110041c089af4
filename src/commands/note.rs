use clap::{Args, Subcommand};

use taskmaster_core::SyncEngine;

use super::{resolve_id, short_id, OutputFormat};

#[derive(Args)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub command: NoteSubcommand,
}

#[derive(Subcommand)]
pub enum NoteSubcommand {
    /// Create a note
    Add {
        /// Note title
        title: String,

        /// Initial content
        #[arg(long, short)]
        content: Option<String>,
    },

    /// List notes, most recently edited first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a note
    Show {
        /// List position or id prefix
        note: String,
    },

    /// Change a note's title or content
    Edit {
        /// List position or id prefix
        note: String,

        /// New title
        #[arg(long, short)]
        title: Option<String>,

        /// New content
        #[arg(long, short)]
        content: Option<String>,
    },

    /// Delete a note
    Rm {
        /// List position or id prefix
        note: String,
    },
}

impl NoteCommand {
    pub fn run(&self, engine: &mut SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            NoteSubcommand::Add { title, content } => {
                let id = engine.add_note(title);
                if let Some(content) = content {
                    engine.save_note(id.as_str(), title, content);
                }
                println!("Created note {}", short_id(id.as_str()));
                Ok(())
            }
            NoteSubcommand::List { format } => {
                let notes = &engine.state().notes;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(notes)?);
                    }
                    OutputFormat::Text => {
                        if notes.is_empty() {
                            println!("No notes.");
                        }
                        for (i, note) in notes.iter().enumerate() {
                            println!("{:>3}. {}  {}", i + 1, note.title, short_id(note.id.as_str()));
                            let preview = note.preview();
                            if !preview.is_empty() {
                                println!("     {}", preview.replace('\n', " "));
                            }
                        }
                    }
                }
                Ok(())
            }
            NoteSubcommand::Show { note } => {
                let id = resolve_note(engine, note)?;
                if let Some(note) = engine.state().note(&id) {
                    println!("{}", note.title);
                    println!(
                        "Updated: {}",
                        note.updated_at
                            .with_timezone(&chrono::Local)
                            .format("%Y-%m-%d %H:%M")
                    );
                    println!();
                    println!("{}", note.content);
                }
                Ok(())
            }
            NoteSubcommand::Edit {
                note,
                title,
                content,
            } => {
                if title.is_none() && content.is_none() {
                    return Err("Specify --title and/or --content".into());
                }
                let id = resolve_note(engine, note)?;
                let (current_title, current_content) = match engine.state().note(&id) {
                    Some(note) => (note.title.clone(), note.content.clone()),
                    None => return Err(format!("Note not found: {}", id).into()),
                };

                let title = title.as_deref().unwrap_or(&current_title);
                let content = content.as_deref().unwrap_or(&current_content);
                engine.save_note(&id, title, content);
                println!("Saved note {}", short_id(&id));
                Ok(())
            }
            NoteSubcommand::Rm { note } => {
                let id = resolve_note(engine, note)?;
                engine.delete_note(&id);
                println!("Deleted note {}", short_id(&id));
                Ok(())
            }
        }
    }
}

fn resolve_note(engine: &SyncEngine, reference: &str) -> Result<String, String> {
    let notes = &engine.state().notes;
    resolve_id(notes.iter().map(|n| n.id.as_str()), reference, "note")
}
