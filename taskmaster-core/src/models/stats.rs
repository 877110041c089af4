use serde::{Deserialize, Serialize};

use super::task::Task;

/// Aggregate productivity counters, stored as a single document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub total_pomodoros: u32,
    pub total_minutes: u32,
}

impl Stats {
    /// Completed share of all tasks as a whole percentage.
    pub fn productivity(&self) -> u32 {
        if self.total_tasks == 0 {
            return 0;
        }
        (f64::from(self.completed_tasks) / f64::from(self.total_tasks) * 100.0).round() as u32
    }

    pub fn record_task_added(&mut self) {
        self.total_tasks += 1;
    }

    pub fn record_completion(&mut self, completed: bool) {
        if completed {
            self.completed_tasks += 1;
        } else {
            self.completed_tasks = self.completed_tasks.saturating_sub(1);
        }
    }

    pub fn record_task_deleted(&mut self, was_completed: bool) {
        if was_completed {
            self.completed_tasks = self.completed_tasks.saturating_sub(1);
        }
        self.total_tasks = self.total_tasks.saturating_sub(1);
    }

    pub fn record_pomodoro(&mut self, minutes: u32) {
        self.total_pomodoros += 1;
        self.total_minutes += minutes;
    }

    /// Recounts task totals from the current list and zeroes pomodoro counters.
    pub fn reset(tasks: &[Task]) -> Self {
        Self {
            total_tasks: tasks.len() as u32,
            completed_tasks: tasks.iter().filter(|t| t.completed).count() as u32,
            total_pomodoros: 0,
            total_minutes: 0,
        }
    }
}
