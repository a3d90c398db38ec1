use crate::error::AppError;
use crate::monitor::Reminder;
use crate::notify::{Notifier, reminder_message};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title("taskmaster")
            .text1(&reminder_message(reminder))
            .text2(&format!("Priority: {}", reminder.priority))
            .show()
            .map_err(|err| AppError::notification(err.to_string()))?;
        Ok(())
    }
}
