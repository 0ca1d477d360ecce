//! Cache-aside orchestration over the task store.
//!
//! Reads probe the cache first and repopulate it on a miss. Mutations go to
//! the store, then overwrite or evict the affected `task:{id}` entry and drop
//! every cached list result. Cache failures are logged and never surface to
//! the caller; the store is always the source of truth.
//!
//! When a mutation cannot reach the cache, the service marks the cache
//! dirty. Reads then bypass it until a full clear succeeds, so an entry
//! written before the failure is never served after it.
//!
//! A coarse read/write lock serialises mutations against cache-repopulating
//! reads, so a reader can never write back a value that a concurrent
//! mutation has already replaced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::cache::{CacheError, CacheStore, TaskCache};
use crate::error::CoreError;
use crate::models::{
    format_canonical_date, parse_canonical_date, Completion, NewTaskData, Task, UpdateTaskData,
};
use crate::recurrence::{self, RecurrenceError, RecurrenceRule};
use crate::repository::{ensure_valid_id, TaskRepository};

/// Source of "today" for date normalisation and task completion.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Collaborators a [`TaskService`] is built from.
pub struct ServiceHandles<R, C> {
    pub repository: R,
    pub cache: C,
    pub clock: Arc<dyn Clock>,
}

impl<R, C> ServiceHandles<R, C> {
    pub fn new(repository: R, cache: C) -> Self {
        Self {
            repository,
            cache,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

pub struct TaskService<R, C> {
    repository: R,
    cache: TaskCache<C>,
    clock: Arc<dyn Clock>,
    lock: RwLock<()>,
    /// Set when a mutation failed to update the cache.
    cache_dirty: AtomicBool,
}

impl<R: TaskRepository, C: CacheStore> TaskService<R, C> {
    pub fn new(handles: ServiceHandles<R, C>) -> Self {
        Self {
            repository: handles.repository,
            cache: TaskCache::new(handles.cache),
            clock: handles.clock,
            lock: RwLock::new(()),
            cache_dirty: AtomicBool::new(false),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn cache(&self) -> &TaskCache<C> {
        &self.cache
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, CoreError> {
        ensure_valid_id(id)?;
        let (_guard, trusted) = self.read_lock().await;
        if !trusted {
            return self.repository.get_by_id(id).await;
        }

        match self.cache.get_task(id).await {
            Ok(Some(task)) => {
                tracing::debug!(id, "task served from cache");
                return Ok(task);
            }
            Ok(None) => tracing::debug!(id, "task cache miss"),
            Err(error) => log_cache_error("get_task", &error),
        }

        let task = self.repository.get_by_id(id).await?;
        if let Err(error) = self.cache.set_task(&task).await {
            log_cache_error("set_task", &error);
        }
        Ok(task)
    }

    /// Lists tasks ordered by date.
    ///
    /// On a cold cache the whole table is loaded once to warm the per-task
    /// entries, then the filtered query is issued against the store; later
    /// queries are answered from the warmed entries.
    pub async fn list_tasks(&self, limit: i64, search: &str) -> Result<Vec<Task>, CoreError> {
        let (_guard, trusted) = self.read_lock().await;
        if !trusted {
            return self.repository.list(limit, search).await;
        }

        match self.cache.get_list(limit, search).await {
            Ok(Some(tasks)) => {
                tracing::debug!(limit, search, "list served from cache");
                return Ok(tasks);
            }
            Ok(None) => {}
            Err(error) => log_cache_error("get_list", &error),
        }

        match self.cache.scan_and_filter(limit, search).await {
            Ok(Some(tasks)) => {
                tracing::debug!(limit, search, "list rebuilt from cached tasks");
                self.remember_list(limit, search, &tasks).await;
                return Ok(tasks);
            }
            Ok(None) => {}
            Err(error) => log_cache_error("scan_and_filter", &error),
        }

        tracing::debug!(limit, search, "list cache miss, warming from store");
        let all = self.repository.list(-1, "").await?;
        if let Err(error) = self.cache.warm(&all).await {
            log_cache_error("warm", &error);
        }

        let tasks = self.repository.list(limit, search).await?;
        self.remember_list(limit, search, &tasks).await;
        Ok(tasks)
    }

    pub async fn add_task(&self, mut data: NewTaskData) -> Result<i64, CoreError> {
        ensure_title(&data.title)?;
        data.date = self.normalize_date(&data.date, &data.repeat)?;

        let _guard = self.lock.write().await;
        let id = self.repository.create(&data).await?;
        let task = data.into_task(id);
        tracing::info!(id, date = %task.date, "task created");

        self.write_through(&task).await;
        self.invalidate_lists().await;
        Ok(id)
    }

    /// Replaces every field of an existing task, returning the stored value.
    pub async fn update_task(&self, mut task: Task) -> Result<Task, CoreError> {
        ensure_valid_id(task.id)?;
        ensure_title(&task.title)?;
        task.date = self.normalize_date(&task.date, &task.repeat)?;

        let _guard = self.lock.write().await;
        self.store_update(&task).await?;
        Ok(task)
    }

    /// Applies a partial edit to the stored task. The read and the write
    /// happen under one exclusive lock, so concurrent edits of different
    /// fields do not overwrite each other.
    pub async fn edit_task(&self, id: i64, edit: UpdateTaskData) -> Result<Task, CoreError> {
        ensure_valid_id(id)?;
        if edit.is_empty() {
            return Err(CoreError::InvalidInput("nothing to update".to_string()));
        }

        let _guard = self.lock.write().await;
        let mut task = edit.apply(self.repository.get_by_id(id).await?);
        ensure_title(&task.title)?;
        task.date = self.normalize_date(&task.date, &task.repeat)?;

        self.store_update(&task).await?;
        Ok(task)
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), CoreError> {
        ensure_valid_id(id)?;

        let _guard = self.lock.write().await;
        self.repository.delete(id).await?;
        tracing::info!(id, "task deleted");

        self.evict(id).await;
        self.invalidate_lists().await;
        Ok(())
    }

    /// Marks a task done: one-shot tasks are deleted, recurring tasks move
    /// to their next occurrence after today.
    pub async fn complete_task(&self, id: i64) -> Result<Completion, CoreError> {
        ensure_valid_id(id)?;

        let _guard = self.lock.write().await;
        let task = self.repository.get_by_id(id).await?;

        if !task.is_recurring() {
            self.repository.delete(id).await?;
            tracing::info!(id, "one-shot task completed and deleted");
            self.evict(id).await;
            self.invalidate_lists().await;
            return Ok(Completion::Deleted);
        }

        let next = recurrence::next_date(self.today(), &task.date, &task.repeat)?;
        self.repository.update_date(id, &next).await?;
        let updated = self.repository.get_by_id(id).await?;
        tracing::info!(id, from = %task.date, to = %updated.date, "recurring task rescheduled");

        self.write_through(&updated).await;
        self.invalidate_lists().await;
        Ok(Completion::Rescheduled(updated))
    }

    /// Next occurrence for arbitrary input. `now` defaults to today.
    pub fn next_date(&self, now: Option<&str>, date: &str, repeat: &str) -> Result<String, CoreError> {
        let now = match now.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_canonical_date(raw)
                .ok_or_else(|| RecurrenceError::InvalidDateFormat(raw.to_string()))?,
            None => self.today(),
        };
        Ok(recurrence::next_date(now, date, repeat)?)
    }

    /// Drops every cache entry. The next reads repopulate from the store.
    pub async fn clear_cache(&self) -> Result<usize, CoreError> {
        let _guard = self.lock.write().await;
        let removed = self.cache.clear_all().await?;
        self.cache_dirty.store(false, Ordering::Release);
        Ok(removed)
    }

    /// Validates `date` and `repeat`, defaulting an empty date to today and
    /// moving past dates forward: to today for one-shot tasks, to the next
    /// occurrence for recurring ones.
    fn normalize_date(&self, date: &str, repeat: &str) -> Result<String, CoreError> {
        let today = self.today();
        let date = date.trim();
        let parsed = if date.is_empty() {
            today
        } else {
            parse_canonical_date(date)
                .ok_or_else(|| RecurrenceError::InvalidDateFormat(date.to_string()))?
        };

        let rule = RecurrenceRule::parse_optional(repeat)?;
        if parsed >= today {
            return Ok(format_canonical_date(parsed));
        }

        let next = match rule {
            None => today,
            Some(rule) => rule.next_after(parsed, today)?,
        };
        Ok(format_canonical_date(next))
    }

    /// Caller holds the write lock.
    async fn store_update(&self, task: &Task) -> Result<(), CoreError> {
        self.repository.update(task).await?;
        tracing::info!(id = task.id, date = %task.date, "task updated");

        self.write_through(task).await;
        self.invalidate_lists().await;
        Ok(())
    }

    /// Takes the shared lock and reports whether the cache may be used.
    ///
    /// A dirty cache is cleared under the exclusive lock first, so no other
    /// reader is repopulating it meanwhile. Reports false until that clear
    /// succeeds.
    async fn read_lock(&self) -> (RwLockReadGuard<'_, ()>, bool) {
        let guard = self.lock.read().await;
        if !self.cache_dirty.load(Ordering::Acquire) {
            return (guard, true);
        }
        drop(guard);

        let guard = self.lock.write().await;
        let trusted = self.recover_cache().await;
        (guard.downgrade(), trusted)
    }

    /// Caller holds the write lock.
    async fn recover_cache(&self) -> bool {
        if !self.cache_dirty.load(Ordering::Acquire) {
            return true;
        }
        match self.cache.clear_all().await {
            Ok(removed) => {
                self.cache_dirty.store(false, Ordering::Release);
                tracing::info!(removed, "cache cleared after failed writes");
                true
            }
            Err(error) => {
                log_cache_error("clear_all", &error);
                false
            }
        }
    }

    fn mark_dirty(&self, operation: &str, error: &CacheError) {
        log_cache_error(operation, error);
        self.cache_dirty.store(true, Ordering::Release);
    }

    async fn write_through(&self, task: &Task) {
        if let Err(error) = self.cache.set_task(task).await {
            self.mark_dirty("set_task", &error);
        }
    }

    async fn evict(&self, id: i64) {
        if let Err(error) = self.cache.delete_task(id).await {
            self.mark_dirty("delete_task", &error);
        }
    }

    async fn invalidate_lists(&self) {
        match self.cache.invalidate_queries().await {
            Ok(removed) => tracing::debug!(removed, "list caches invalidated"),
            Err(error) => self.mark_dirty("invalidate_queries", &error),
        }
    }

    async fn remember_list(&self, limit: i64, search: &str, tasks: &[Task]) {
        if let Err(error) = self.cache.set_list(limit, search, tasks).await {
            log_cache_error("set_list", &error);
        }
    }
}

fn ensure_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::InvalidInput("title is required".to_string()));
    }
    Ok(())
}

fn log_cache_error(operation: &str, error: &CacheError) {
    tracing::warn!(operation, %error, "cache operation failed, continuing with store");
}
