//! Deadline reminders.
//!
//! The monitor is split in two. [`DeadlineMonitor`] is a cancellable
//! recurring timer that only signals through a callback; it never touches
//! task state. [`sweep`] is the read-only pass the owner of the task
//! collection runs on each signal, so it always sees a consistent collection.

use crate::error::AppError;
use crate::model::{Priority, Task};
use crate::notify::Notifier;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use time::Date;
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: u64,
    pub text: String,
    pub deadline: Date,
    pub priority: Priority,
}

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub reminded: Vec<Reminder>,
    pub failures: Vec<ReminderFailure>,
}

#[derive(Debug)]
pub struct ReminderFailure {
    pub task_id: u64,
    pub error: AppError,
}

/// Incomplete tasks whose deadline is exactly `today`, in collection order.
pub fn due_today(tasks: &[Task], today: Date) -> Vec<Reminder> {
    tasks
        .iter()
        .filter(|task| task.is_due_on(today))
        .filter_map(|task| {
            task.deadline.map(|deadline| Reminder {
                task_id: task.id,
                text: task.text.clone(),
                deadline,
                priority: task.priority,
            })
        })
        .collect()
}

pub fn sweep(tasks: &[Task], today: Date, notifier: &dyn Notifier) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    for reminder in due_today(tasks, today) {
        match notifier.remind(&reminder) {
            Ok(()) => outcome.reminded.push(reminder),
            Err(error) => {
                warn!(task_id = reminder.task_id, error = %error, "reminder delivery failed");
                outcome.failures.push(ReminderFailure {
                    task_id: reminder.task_id,
                    error,
                });
            }
        }
    }

    debug!(
        %today,
        reminded = outcome.reminded.len(),
        failed = outcome.failures.len(),
        "deadline sweep finished"
    );
    outcome
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Armed,
}

struct Timer {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct DeadlineMonitor {
    interval: Duration,
    timer: Option<Timer>,
}

impl DeadlineMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> MonitorState {
        match &self.timer {
            Some(timer) if !timer.handle.is_finished() => MonitorState::Armed,
            _ => MonitorState::Idle,
        }
    }

    /// Starts firing `on_fire` once per interval, replacing any running timer.
    ///
    /// The timer stops when `on_fire` returns `false`, typically because the
    /// receiving side of its channel is gone.
    pub fn arm<F>(&mut self, mut on_fire: F) -> Result<(), AppError>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.disarm();

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("deadline-monitor".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !on_fire() {
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|err| AppError::io(err.to_string()))?;

        self.timer = Some(Timer {
            stop: stop_tx,
            handle,
        });
        info!(interval_secs = interval.as_secs(), "deadline monitor armed");
        Ok(())
    }

    /// Cancels the timer and waits for its thread; no firing happens after
    /// this returns.
    pub fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.stop.send(());
            if timer.handle.join().is_err() {
                warn!("deadline monitor thread panicked");
            }
            info!("deadline monitor disarmed");
        }
    }
}

impl Default for DeadlineMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl Drop for DeadlineMonitor {
    fn drop(&mut self) {
        self.disarm();
    }
}
