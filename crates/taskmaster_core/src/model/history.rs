use crate::model::Task;
use serde::{Deserialize, Serialize};

/// Snapshot of a task taken when it was completed or deleted.
///
/// Serialized flat: the task's own fields plus exactly one of
/// `completedAt` / `deletedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub task: Task,
    #[serde(flatten)]
    pub event: HistoryEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEvent {
    Completed {
        #[serde(rename = "completedAt")]
        completed_at: String,
    },
    Deleted {
        #[serde(rename = "deletedAt")]
        deleted_at: String,
    },
}

impl HistoryEntry {
    pub fn completed(task: Task, completed_at: String) -> Self {
        Self {
            task,
            event: HistoryEvent::Completed { completed_at },
        }
    }

    pub fn deleted(task: Task, deleted_at: String) -> Self {
        Self {
            task,
            event: HistoryEvent::Deleted { deleted_at },
        }
    }

    pub fn completed_at(&self) -> Option<&str> {
        match &self.event {
            HistoryEvent::Completed { completed_at } => Some(completed_at),
            HistoryEvent::Deleted { .. } => None,
        }
    }

    pub fn deleted_at(&self) -> Option<&str> {
        match &self.event {
            HistoryEvent::Deleted { deleted_at } => Some(deleted_at),
            HistoryEvent::Completed { .. } => None,
        }
    }

    pub fn timestamp(&self) -> &str {
        match &self.event {
            HistoryEvent::Completed { completed_at } => completed_at,
            HistoryEvent::Deleted { deleted_at } => deleted_at,
        }
    }

    pub fn action_label(&self) -> &'static str {
        match self.event {
            HistoryEvent::Completed { .. } => "completed",
            HistoryEvent::Deleted { .. } => "deleted",
        }
    }
}
