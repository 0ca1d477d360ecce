use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CacheResult, CacheStore};
use crate::models::Task;
use crate::repository::{sort_tasks, TaskSearch};

const TASK_PREFIX: &str = "task:";
const QUERY_PREFIX: &str = "tasks:";
/// Present while every stored task has a `task:` entry.
const COMPLETE_MARKER: &str = "tasks-index:complete";

/// Typed view over a [`CacheStore`] holding task entries and list results.
///
/// Keys:
/// - `task:{id}` — one serialized task
/// - `tasks:{limit}:{search}` — the result of one list query
/// - `tasks-index:complete` — set after a full warm
#[derive(Debug, Clone)]
pub struct TaskCache<C> {
    store: C,
}

impl<C: CacheStore> TaskCache<C> {
    pub fn new(store: C) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn task_key(id: i64) -> String {
        format!("{}{}", TASK_PREFIX, id)
    }

    /// Unbounded limits share a key, and search text is trimmed the same
    /// way the store trims it.
    pub fn query_key(limit: i64, search: &str) -> String {
        format!("{}{}:{}", QUERY_PREFIX, limit.max(0), search.trim())
    }

    pub async fn get_task(&self, id: i64) -> CacheResult<Option<Task>> {
        self.get_json(&Self::task_key(id)).await
    }

    pub async fn set_task(&self, task: &Task) -> CacheResult<()> {
        self.set_json(&Self::task_key(task.id), task).await
    }

    pub async fn delete_task(&self, id: i64) -> CacheResult<()> {
        self.store.delete(&Self::task_key(id)).await?;
        Ok(())
    }

    pub async fn get_list(&self, limit: i64, search: &str) -> CacheResult<Option<Vec<Task>>> {
        self.get_json(&Self::query_key(limit, search)).await
    }

    pub async fn set_list(&self, limit: i64, search: &str, tasks: &[Task]) -> CacheResult<()> {
        self.set_json(&Self::query_key(limit, search), tasks).await
    }

    /// Writes an entry for every task and marks the mirror complete.
    pub async fn warm(&self, tasks: &[Task]) -> CacheResult<()> {
        for task in tasks {
            self.set_task(task).await?;
        }
        self.store.set(COMPLETE_MARKER, "1".to_string()).await
    }

    pub async fn is_complete(&self) -> CacheResult<bool> {
        Ok(self.store.get(COMPLETE_MARKER).await?.is_some())
    }

    pub async fn mark_incomplete(&self) -> CacheResult<()> {
        self.store.delete(COMPLETE_MARKER).await?;
        Ok(())
    }

    /// Drops every cached list result.
    pub async fn invalidate_queries(&self) -> CacheResult<usize> {
        self.store.delete_prefix(QUERY_PREFIX).await
    }

    /// Drops everything this cache owns.
    pub async fn clear_all(&self) -> CacheResult<usize> {
        let mut removed = self.store.delete_prefix(TASK_PREFIX).await?;
        removed += self.store.delete_prefix(QUERY_PREFIX).await?;
        if self.store.delete(COMPLETE_MARKER).await? {
            removed += 1;
        }
        Ok(removed)
    }

    /// Rebuilds a list result from cached task entries.
    ///
    /// Returns `None` unless the mirror is complete, since a partial mirror
    /// would silently drop rows. A corrupt entry also yields `None` and
    /// clears the completeness marker.
    pub async fn scan_and_filter(&self, limit: i64, search: &str) -> CacheResult<Option<Vec<Task>>> {
        if !self.is_complete().await? {
            return Ok(None);
        }

        let filter = TaskSearch::parse(search);
        let mut tasks = Vec::new();
        for (key, raw) in self.store.scan_prefix(TASK_PREFIX).await? {
            match serde_json::from_str::<Task>(&raw) {
                Ok(task) => {
                    if filter.matches(&task) {
                        tasks.push(task);
                    }
                }
                Err(error) => {
                    self.discard_corrupt(&key, &error).await?;
                    return Ok(None);
                }
            }
        }

        sort_tasks(&mut tasks);
        if limit > 0 {
            tasks.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(Some(tasks))
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                self.discard_corrupt(key, &error).await?;
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    async fn discard_corrupt(&self, key: &str, error: &serde_json::Error) -> CacheResult<()> {
        tracing::warn!(key, %error, "discarding corrupt cache entry");
        self.store.delete(key).await?;
        if key.starts_with(TASK_PREFIX) {
            self.mark_incomplete().await?;
        }
        Ok(())
    }
}
