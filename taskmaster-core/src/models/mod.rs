mod id;
mod note;
mod reminder;
mod session;
mod settings;
mod stats;
mod task;

pub use id::{EntityId, EntityIdError, MAX_ID_LEN};
pub use note::{Note, UNTITLED_NOTE};
pub use reminder::{Reminder, RepeatInterval};
pub use session::Session;
pub use settings::{Settings, Theme};
pub use stats::Stats;
pub use task::{Category, Priority, Task, TaskFilter};
