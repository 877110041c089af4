use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Personal,
    #[default]
    Work,
    Office,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Personal => write!(f, "personal"),
            Category::Work => write!(f, "work"),
            Category::Office => write!(f, "office"),
            Category::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "personal" => Ok(Category::Personal),
            "work" => Ok(Category::Work),
            "office" => Ok(Category::Office),
            "other" => Ok(Category::Other),
            _ => Err(format!(
                "Invalid category '{}'. Valid options: personal, work, office, other",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!(
                "Invalid priority '{}'. Valid options: low, medium, high",
                s
            )),
        }
    }
}

/// Which tasks a list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    All,
    #[default]
    Active,
    Completed,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "active" => Ok(TaskFilter::Active),
            "completed" | "done" => Ok(TaskFilter::Completed),
            _ => Err(format!(
                "Invalid filter '{}'. Valid options: all, active, completed",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntityId,
    pub text: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    /// Sort key, higher first. Zero means "not ranked yet" (legacy data).
    #[serde(default)]
    pub rank: f64,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::generate(),
            text: text.into(),
            category: Category::default(),
            priority: Priority::default(),
            completed: false,
            created_at: now,
            due_date: now.date_naive(),
            rank: now.timestamp_millis() as f64,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    /// Rank used for ordering; unranked tasks fall back to their creation time.
    pub fn effective_rank(&self) -> f64 {
        if self.rank == 0.0 {
            self.created_at.timestamp_millis() as f64
        } else {
            self.rank
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.completed { "x" } else { " " };
        write!(
            f,
            "[{}] {} ({}, {}, due {})",
            mark, self.text, self.category, self.priority, self.due_date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new_defaults() {
        let task = Task::new("Buy milk");
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.category, Category::Work);
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert_eq!(task.due_date, task.created_at.date_naive());
        assert!(task.rank > 0.0);
    }

    #[test]
    fn test_category_and_priority_from_str() {
        assert_eq!(Category::from_str("Personal").unwrap(), Category::Personal);
        assert_eq!(Priority::from_str("HIGH").unwrap(), Priority::High);
        assert!(Category::from_str("home").is_err());
        assert!(Priority::from_str("urgent").is_err());
    }

    #[test]
    fn test_task_json_uses_camel_case() {
        let task = Task::new("Write report").with_priority(Priority::High);
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("dueDate").is_some());
        assert_eq!(json["priority"], "high");
        assert_eq!(json["category"], "work");
    }

    #[test]
    fn test_legacy_task_without_rank() {
        let json = r#"{
            "id": 1700000000000,
            "text": "Old task",
            "category": "office",
            "priority": "low",
            "completed": true,
            "createdAt": "2023-11-14T22:13:20.000Z",
            "dueDate": "2023-11-14"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "1700000000000");
        assert_eq!(task.rank, 0.0);
        assert_eq!(task.effective_rank(), 1_700_000_000_000.0);
        assert!(task.completed);
    }

    #[test]
    fn test_filter_matches() {
        let mut task = Task::new("x");
        assert!(TaskFilter::Active.matches(&task));
        assert!(!TaskFilter::Completed.matches(&task));
        task.completed = true;
        assert!(TaskFilter::Completed.matches(&task));
        assert!(TaskFilter::All.matches(&task));
    }
}
