use crate::error::CoreError;
use crate::models::{format_canonical_date, parse_display_date, NewTaskData, Task};
use async_trait::async_trait;

pub mod tasks;

pub use tasks::SqliteRepository;

/// Durable task storage consumed by the service layer.
///
/// Title and id validation happen before these methods are called; the
/// store only rejects non-positive ids on mutations so a bad id can never
/// reach SQL.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a task and returns the id assigned to it.
    async fn create(&self, data: &NewTaskData) -> Result<i64, CoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, CoreError>;
    /// Tasks ordered by date, optionally filtered and limited.
    ///
    /// `limit <= 0` means no limit. See [`TaskSearch::parse`] for how
    /// `search` is interpreted.
    async fn list(&self, limit: i64, search: &str) -> Result<Vec<Task>, CoreError>;
    async fn update(&self, task: &Task) -> Result<(), CoreError>;
    async fn delete(&self, id: i64) -> Result<(), CoreError>;
    async fn update_date(&self, id: i64, next: &str) -> Result<(), CoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Task, CoreError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }
}

/// Interpretation of a list search string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSearch {
    All,
    /// Exact match on the canonical date.
    Date(String),
    /// Substring of title or comment, ASCII case-insensitive.
    Text(String),
}

impl TaskSearch {
    pub fn parse(search: &str) -> Self {
        let search = search.trim();
        if search.is_empty() {
            TaskSearch::All
        } else if let Some(date) = parse_display_date(search) {
            TaskSearch::Date(format_canonical_date(date))
        } else {
            TaskSearch::Text(search.to_string())
        }
    }

    /// In-memory equivalent of the SQL filter, used when rebuilding lists
    /// from cached entries.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskSearch::All => true,
            TaskSearch::Date(date) => task.date == *date,
            TaskSearch::Text(text) => {
                let needle = text.to_ascii_lowercase();
                task.title.to_ascii_lowercase().contains(&needle)
                    || task.comment.to_ascii_lowercase().contains(&needle)
            }
        }
    }
}

/// Ordering shared by the store and cache-side list reconstruction.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
}

pub(crate) fn ensure_valid_id(id: i64) -> Result<(), CoreError> {
    if id <= 0 {
        return Err(CoreError::InvalidTaskId(id));
    }
    Ok(())
}
