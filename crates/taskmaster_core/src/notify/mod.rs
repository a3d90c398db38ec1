use crate::error::AppError;
use crate::monitor::Reminder;
use std::sync::Mutex;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const DISABLE_ENV_VAR: &str = "TASKMASTER_DISABLE_NOTIFICATIONS";

pub trait Notifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn remind(&self, _reminder: &Reminder) -> Result<(), AppError> {
        Ok(())
    }
}

/// Keeps every reminder it receives so callers can inspect them afterwards.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    received: Mutex<Vec<Reminder>>,
}

impl CollectingNotifier {
    pub fn take(&self) -> Vec<Reminder> {
        match self.received.lock() {
            Ok(mut received) => std::mem::take(&mut *received),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for CollectingNotifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError> {
        self.received
            .lock()
            .map_err(|_| AppError::notification("reminder buffer poisoned"))?
            .push(reminder.clone());
        Ok(())
    }
}

pub fn reminder_message(reminder: &Reminder) -> String {
    format!("Reminder: Task \"{}\" is due today!", reminder.text)
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopNotifier)),
            other => Err(other),
        },
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
