use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Storage and exchange format for task dates.
pub const CANONICAL_DATE_FORMAT: &str = "%Y%m%d";

/// Day-month-year form accepted in list searches.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    /// Canonical `YYYYMMDD` date.
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub comment: String,
    /// Empty for one-shot tasks, otherwise a recurrence rule.
    #[serde(default)]
    pub repeat: String,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        !self.repeat.trim().is_empty()
    }
}

/// Input for creating a task. `date` may be empty, meaning "today".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaskData {
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub repeat: String,
}

impl NewTaskData {
    pub fn into_task(self, id: i64) -> Task {
        Task {
            id,
            date: self.date,
            title: self.title,
            comment: self.comment,
            repeat: self.repeat,
        }
    }
}

/// Partial edit of an existing task. `None` leaves a field unchanged;
/// `Some(String::new())` clears `comment` or `repeat`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskData {
    pub title: Option<String>,
    pub date: Option<String>,
    pub comment: Option<String>,
    pub repeat: Option<String>,
}

impl UpdateTaskData {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.date.is_none() && self.comment.is_none() && self.repeat.is_none()
    }

    pub fn apply(self, task: Task) -> Task {
        Task {
            id: task.id,
            date: self.date.unwrap_or(task.date),
            title: self.title.unwrap_or(task.title),
            comment: self.comment.unwrap_or(task.comment),
            repeat: self.repeat.unwrap_or(task.repeat),
        }
    }
}

/// Outcome of completing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// One-shot task, removed from the store.
    Deleted,
    /// Recurring task moved to its next occurrence.
    Rescheduled(Task),
}

/// Parses a strict 8-digit `YYYYMMDD` date.
pub fn parse_canonical_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, CANONICAL_DATE_FORMAT).ok()
}

pub fn format_canonical_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Parses a zero-padded `DD.MM.YYYY` date.
pub fn parse_display_date(s: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(s, DISPLAY_DATE_FORMAT).ok()?;
    (date.format(DISPLAY_DATE_FORMAT).to_string() == s).then_some(date)
}
