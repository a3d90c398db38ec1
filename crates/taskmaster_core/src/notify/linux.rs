use crate::error::AppError;
use crate::model::Priority;
use crate::monitor::Reminder;
use crate::notify::{Notifier, reminder_message};
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError> {
        let urgency = match reminder.priority {
            Priority::High => Urgency::Critical,
            Priority::Medium => Urgency::Normal,
            Priority::Low => Urgency::Low,
        };

        Notification::new()
            .summary("taskmaster")
            .body(&format!("{} ({})", reminder_message(reminder), reminder.priority))
            .urgency(urgency)
            .show()
            .map_err(|err| AppError::notification(err.to_string()))?;

        Ok(())
    }
}
