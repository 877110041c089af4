use chrono::NaiveDate;
use clap::{Args, Subcommand};

use taskmaster_core::{Category, Priority, SyncEngine, Task, TaskFilter};

use super::{resolve_id, short_id, OutputFormat};

#[derive(Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Add a task at the top of the list
    Add {
        /// Task text
        #[arg(required = true)]
        text: Vec<String>,

        /// Category (personal, work, office, other)
        #[arg(long, short, default_value = "work")]
        category: String,

        /// Priority (low, medium, high)
        #[arg(long, short, default_value = "medium")]
        priority: String,

        /// Due date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        due: Option<String>,
    },

    /// List tasks
    List {
        /// Which tasks to show (all, active, completed)
        #[arg(long, short, default_value = "active")]
        filter: String,

        /// Only show one category
        #[arg(long, short)]
        category: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Toggle a task's completed state
    Done {
        /// List position or id prefix
        task: String,
    },

    /// Change a task's text
    Edit {
        /// List position or id prefix
        task: String,

        /// New text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Delete a task
    Rm {
        /// List position or id prefix
        task: String,
    },

    /// Move a task within the list
    Move {
        /// List position or id prefix
        task: String,

        /// Move one place up
        #[arg(long, conflicts_with_all = ["down", "to"])]
        up: bool,

        /// Move one place down
        #[arg(long, conflicts_with = "to")]
        down: bool,

        /// Move to this 1-based position
        #[arg(long)]
        to: Option<usize>,
    },

    /// Delete all completed tasks
    Clear,
}

impl TaskCommand {
    pub fn run(&self, engine: &mut SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            TaskSubcommand::Add {
                text,
                category,
                priority,
                due,
            } => {
                let category: Category = category.parse()?;
                let priority: Priority = priority.parse()?;
                let due_date = due.as_deref().map(parse_date).transpose()?;

                match engine.add_task(&text.join(" "), category, priority, due_date) {
                    Some(id) => println!("Added task {}", short_id(id.as_str())),
                    None => return Err("Task text cannot be empty".into()),
                }
                Ok(())
            }
            TaskSubcommand::List {
                filter,
                category,
                format,
            } => {
                let filter: TaskFilter = filter.parse()?;
                let category: Option<Category> =
                    category.as_deref().map(str::parse::<Category>).transpose()?;
                list_tasks(engine, filter, category, format)
            }
            TaskSubcommand::Done { task } => {
                let id = resolve_task(engine, task)?;
                engine.toggle_task(&id);
                if let Some(task) = engine.state().task(&id) {
                    let state = if task.completed { "completed" } else { "active" };
                    println!("Marked '{}' {}", task.text, state);
                }
                Ok(())
            }
            TaskSubcommand::Edit { task, text } => {
                let id = resolve_task(engine, task)?;
                if engine.edit_task(&id, &text.join(" ")) {
                    println!("Updated task {}", short_id(&id));
                } else {
                    println!("Nothing to change");
                }
                Ok(())
            }
            TaskSubcommand::Rm { task } => {
                let id = resolve_task(engine, task)?;
                engine.delete_task(&id);
                println!("Deleted task {}", short_id(&id));
                Ok(())
            }
            TaskSubcommand::Move { task, up, down, to } => {
                let id = resolve_task(engine, task)?;
                let moved = if *up {
                    engine.move_task_up(&id)
                } else if *down {
                    engine.move_task_down(&id)
                } else if let Some(position) = to {
                    engine.move_task(&id, position.saturating_sub(1))
                } else {
                    return Err("Specify --up, --down or --to".into());
                };

                if moved {
                    println!("Moved task {}", short_id(&id));
                } else {
                    println!("Task {} is already there", short_id(&id));
                }
                Ok(())
            }
            TaskSubcommand::Clear => {
                let removed = engine.clear_completed();
                println!("Removed {} completed task(s)", removed);
                Ok(())
            }
        }
    }
}

fn resolve_task(engine: &SyncEngine, reference: &str) -> Result<String, String> {
    let tasks = &engine.state().tasks;
    resolve_id(tasks.iter().map(|t| t.id.as_str()), reference, "task")
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", value))
}

fn list_tasks(
    engine: &SyncEngine,
    filter: TaskFilter,
    category: Option<Category>,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // Positions refer to the full list so they stay valid for other commands.
    let visible: Vec<(usize, &Task)> = engine
        .state()
        .tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| filter.matches(task))
        .filter(|(_, task)| category.map_or(true, |c| task.category == c))
        .map(|(i, task)| (i + 1, task))
        .collect();

    match format {
        OutputFormat::Json => {
            let tasks: Vec<&Task> = visible.iter().map(|(_, task)| *task).collect();
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        OutputFormat::Text => {
            if visible.is_empty() {
                println!("No tasks found.");
                return Ok(());
            }
            for (position, task) in visible {
                println!("{:>3}. {}  {}", position, task, short_id(task.id.as_str()));
            }
        }
    }
    Ok(())
}
