use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;
use time::macros::format_description;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "deadline_format")]
    pub deadline: Option<Date>,
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    /// Strictly past deadlines only; a task due today is not overdue yet.
    pub fn is_overdue(&self, today: Date) -> bool {
        !self.completed && self.deadline.is_some_and(|deadline| deadline < today)
    }

    pub fn is_due_on(&self, day: Date) -> bool {
        !self.completed && self.deadline == Some(day)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|priority| priority.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| AppError::invalid_input("priority must be low, medium or high"))
    }
}

pub fn parse_deadline(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input("deadline must be YYYY-MM-DD"))
}

/// Deadlines are stored as `YYYY-MM-DD`, with `""` for "no deadline".
mod deadline_format {
    use super::parse_deadline;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(deadline: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match deadline {
            Some(date) => serializer.serialize_str(&date.to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_deadline(value)
                .map(Some)
                .map_err(|err| D::Error::custom(err.message().to_string())),
        }
    }
}
