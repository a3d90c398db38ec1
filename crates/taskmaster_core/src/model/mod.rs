mod filter;
mod history;
mod task;

pub use filter::{Filter, TaskCounts};
pub use history::{HistoryEntry, HistoryEvent};
pub use task::{Priority, Task, parse_deadline};
