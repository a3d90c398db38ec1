pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod storage;
pub mod task_store;

pub use task_store::TaskStore;
