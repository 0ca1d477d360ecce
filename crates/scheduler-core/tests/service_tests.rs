use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use scheduler_core::cache::{CacheStore, MemoryCache, NoOpCache};
use scheduler_core::db::{establish_connection, IN_MEMORY};
use scheduler_core::error::{CoreError, ErrorKind};
use scheduler_core::models::{Completion, NewTaskData, Task, UpdateTaskData};
use scheduler_core::repository::{SqliteRepository, TaskRepository};
use scheduler_core::service::{FixedClock, ServiceHandles, TaskService};

/// Store calls observed by [`CountingRepository`].
#[derive(Debug, Default)]
struct Calls {
    reads: AtomicUsize,
    lists: AtomicUsize,
}

impl Calls {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

/// Forwards to SQLite while counting reads and list queries.
struct CountingRepository {
    inner: SqliteRepository,
    calls: Arc<Calls>,
}

#[async_trait]
impl TaskRepository for CountingRepository {
    async fn create(&self, data: &NewTaskData) -> Result<i64, CoreError> {
        self.inner.create(data).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, CoreError> {
        self.calls.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn list(&self, limit: i64, search: &str) -> Result<Vec<Task>, CoreError> {
        self.calls.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(limit, search).await
    }

    async fn update(&self, task: &Task) -> Result<(), CoreError> {
        self.inner.update(task).await
    }

    async fn delete(&self, id: i64) -> Result<(), CoreError> {
        self.inner.delete(id).await
    }

    async fn update_date(&self, id: i64, next: &str) -> Result<(), CoreError> {
        self.inner.update_date(id, next).await
    }
}

struct Harness {
    service: TaskService<CountingRepository, MemoryCache>,
    calls: Arc<Calls>,
    memory: MemoryCache,
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y%m%d").unwrap()
}

/// Service over an in-memory database with "today" pinned to 2024-01-20.
async fn setup_service() -> Harness {
    let pool = establish_connection(IN_MEMORY)
        .await
        .expect("Failed to open in-memory database");
    let calls = Arc::new(Calls::default());
    let memory = MemoryCache::new();
    let repository = CountingRepository {
        inner: SqliteRepository::new(pool),
        calls: Arc::clone(&calls),
    };
    let service = TaskService::new(
        ServiceHandles::new(repository, memory.clone()).with_clock(FixedClock(day("20240120"))),
    );
    Harness {
        service,
        calls,
        memory,
    }
}

fn new_task(title: &str, date: &str, comment: &str, repeat: &str) -> NewTaskData {
    NewTaskData {
        title: title.to_string(),
        date: date.to_string(),
        comment: comment.to_string(),
        repeat: repeat.to_string(),
    }
}

async fn stored(h: &Harness, id: i64) -> Task {
    h.service.repository().inner.get_by_id(id).await.unwrap()
}

#[tokio::test]
async fn test_add_task_normalizes_dates() {
    let h = setup_service().await;

    let empty = h.service.add_task(new_task("no date", "", "", "")).await.unwrap();
    let past = h.service.add_task(new_task("late", "20240101", "", "")).await.unwrap();
    let future = h.service.add_task(new_task("later", "20240201", "", "")).await.unwrap();
    let recurring = h
        .service
        .add_task(new_task("weekly review", "20240115", "", "d 7"))
        .await
        .unwrap();

    assert_eq!(stored(&h, empty).await.date, "20240120");
    assert_eq!(stored(&h, past).await.date, "20240120");
    assert_eq!(stored(&h, future).await.date, "20240201");
    assert_eq!(stored(&h, recurring).await.date, "20240122");
}

#[tokio::test]
async fn test_add_task_rejects_bad_input_without_writing() {
    let h = setup_service().await;

    for data in [
        new_task("   ", "20240201", "", ""),
        new_task("bad date", "2024-02-01", "", ""),
        new_task("bad rule", "20240201", "", "d 401"),
        new_task("unknown rule", "20240201", "", "x 1"),
    ] {
        let err = h.service.add_task(data).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{err}");
    }

    assert!(h.service.repository().inner.list(0, "").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_task_is_served_from_cache_after_first_read() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Dentist", "20240301", "", "")).await.unwrap();
    h.service.clear_cache().await.unwrap();

    let first = h.service.get_task(id).await.unwrap();
    assert_eq!(h.calls.reads(), 1);

    let second = h.service.get_task(id).await.unwrap();
    assert_eq!(h.calls.reads(), 1, "second read must be a cache hit");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_get_task_errors() {
    let h = setup_service().await;

    assert!(matches!(h.service.get_task(0).await, Err(CoreError::InvalidTaskId(0))));
    let missing = h.service.get_task(99).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert!(h.memory.get("task:99").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cold_list_warms_cache_then_serves_without_store() {
    let h = setup_service().await;
    let gym = h.service.add_task(new_task("Gym", "20240305", "legs", "")).await.unwrap();
    h.service.add_task(new_task("Dentist", "20240301", "", "")).await.unwrap();
    let stretch = h
        .service
        .add_task(new_task("Stretching", "20240306", "after gym", ""))
        .await
        .unwrap();

    let filtered = h.service.list_tasks(10, "gym").await.unwrap();
    assert_eq!(filtered.iter().map(|t| t.id).collect::<Vec<_>>(), vec![gym, stretch]);
    assert_eq!(h.calls.lists(), 2, "warm load plus the filtered query");

    let again = h.service.list_tasks(10, "gym").await.unwrap();
    assert_eq!(again, filtered);
    assert_eq!(h.calls.lists(), 2, "identical query must be a cache hit");

    let by_date = h.service.list_tasks(0, "05.03.2024").await.unwrap();
    assert_eq!(by_date.len(), 1);
    assert_eq!(by_date[0].id, gym);
    assert_eq!(h.calls.lists(), 2, "new query is rebuilt from cached tasks");
}

#[tokio::test]
async fn test_list_reflects_mutations_after_warm() {
    let h = setup_service().await;
    let first = h.service.add_task(new_task("first", "20240201", "", "")).await.unwrap();
    assert_eq!(h.service.list_tasks(0, "").await.unwrap().len(), 1);
    let lists_after_warm = h.calls.lists();

    let second = h.service.add_task(new_task("second", "20240125", "", "")).await.unwrap();
    let all = h.service.list_tasks(0, "").await.unwrap();
    assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second, first]);

    h.service.delete_task(second).await.unwrap();
    let all = h.service.list_tasks(0, "").await.unwrap();
    assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![first]);
    assert_eq!(h.calls.lists(), lists_after_warm, "mirror stays complete across writes");
}

#[tokio::test]
async fn test_list_limit() {
    let h = setup_service().await;
    for n in 1..=5 {
        h.service
            .add_task(new_task(&format!("task {n}"), &format!("2024020{n}"), "", ""))
            .await
            .unwrap();
    }

    assert_eq!(h.service.list_tasks(3, "").await.unwrap().len(), 3);
    assert_eq!(h.service.list_tasks(0, "").await.unwrap().len(), 5);
    assert_eq!(h.service.list_tasks(-1, "").await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_get_after_update_returns_new_value() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Call", "20240201", "", "")).await.unwrap();
    let cached = h.service.get_task(id).await.unwrap();

    let updated = h
        .service
        .update_task(Task {
            title: "Call back".to_string(),
            comment: "after lunch".to_string(),
            ..cached
        })
        .await
        .unwrap();

    assert_eq!(h.service.get_task(id).await.unwrap(), updated);
    assert_eq!(stored(&h, id).await, updated);
}

#[tokio::test]
async fn test_update_missing_task_is_not_found() {
    let h = setup_service().await;
    let err = h
        .service
        .update_task(Task {
            id: 7,
            date: "20240201".to_string(),
            title: "ghost".to_string(),
            comment: String::new(),
            repeat: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_evicts_cached_task() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Trash", "20240201", "", "")).await.unwrap();
    h.service.get_task(id).await.unwrap();

    h.service.delete_task(id).await.unwrap();

    assert!(h.memory.get(&format!("task:{id}")).await.unwrap().is_none());
    assert_eq!(h.service.get_task(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(h.service.delete_task(id).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_complete_one_shot_twice() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Once", "20240120", "", "")).await.unwrap();

    assert_eq!(h.service.complete_task(id).await.unwrap(), Completion::Deleted);
    let err = h.service.complete_task(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.service.repository().inner.find_by_id(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_complete_recurring_reschedules() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Water plants", "20240120", "", "d 7")).await.unwrap();
    h.service.get_task(id).await.unwrap();

    let completion = h.service.complete_task(id).await.unwrap();
    let Completion::Rescheduled(task) = completion else {
        panic!("recurring task must be rescheduled, got {completion:?}");
    };
    assert_eq!(task.date, "20240127");
    assert_eq!(h.service.get_task(id).await.unwrap().date, "20240127");
    assert_eq!(stored(&h, id).await.date, "20240127");
}

#[tokio::test]
async fn test_complete_task_with_unparsable_rule_fails() {
    let h = setup_service().await;
    let id = h
        .service
        .repository()
        .inner
        .create(&new_task("legacy", "20240120", "", "q 3"))
        .await
        .unwrap();

    let err = h.service.complete_task(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(stored(&h, id).await.date, "20240120");
}

#[tokio::test]
async fn test_corrupt_cache_entry_falls_back_to_store() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Corrupt me", "20240201", "", "")).await.unwrap();
    let key = format!("task:{id}");
    h.memory.set(&key, "{broken".to_string()).await.unwrap();

    let task = h.service.get_task(id).await.unwrap();
    assert_eq!(task.title, "Corrupt me");
    assert_eq!(h.calls.reads(), 1);

    let repaired = h.memory.get(&key).await.unwrap().unwrap();
    assert_eq!(serde_json::from_str::<Task>(&repaired).unwrap(), task);
}

#[tokio::test]
async fn test_corrupt_list_entry_is_rebuilt() {
    let h = setup_service().await;
    h.service.add_task(new_task("One", "20240201", "", "")).await.unwrap();
    h.service.list_tasks(0, "").await.unwrap();
    h.memory.set("tasks:0:", "not a list".to_string()).await.unwrap();

    let tasks = h.service.list_tasks(0, "").await.unwrap();
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn test_operations_succeed_during_cache_outage() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Before", "20240201", "", "d 1")).await.unwrap();
    h.service.get_task(id).await.unwrap();
    assert_eq!(h.service.list_tasks(0, "").await.unwrap().len(), 1);

    h.memory.set_available(false);

    let other = h.service.add_task(new_task("During", "20240202", "", "")).await.unwrap();
    assert_eq!(h.service.get_task(other).await.unwrap().title, "During");
    assert_eq!(h.service.list_tasks(0, "").await.unwrap().len(), 2);
    let renamed = h
        .service
        .update_task(Task {
            title: "Renamed".to_string(),
            ..stored(&h, id).await
        })
        .await
        .unwrap();
    assert_eq!(renamed.title, "Renamed");
    assert!(matches!(
        h.service.complete_task(id).await.unwrap(),
        Completion::Rescheduled(_)
    ));
    let late = h.service.add_task(new_task("Late", "20240203", "", "")).await.unwrap();
    h.service.delete_task(other).await.unwrap();
    assert!(h.service.clear_cache().await.is_err());

    h.memory.set_available(true);

    let current = h.service.get_task(id).await.unwrap();
    assert_eq!(current, stored(&h, id).await);
    assert_eq!(current.title, "Renamed");
    assert_eq!(current.date, "20240202");

    let expected = vec![current, stored(&h, late).await];
    assert_eq!(h.service.list_tasks(0, "").await.unwrap(), expected);
    assert_eq!(h.service.list_tasks(5, "").await.unwrap(), expected);
    assert_eq!(h.service.get_task(other).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_stale_entries_are_dropped_once_cache_returns() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Before", "20240201", "", "")).await.unwrap();
    h.service.get_task(id).await.unwrap();
    h.service.list_tasks(0, "").await.unwrap();

    h.memory.set_available(false);
    h.service
        .edit_task(
            id,
            UpdateTaskData {
                title: Some("After".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let added = h.service.add_task(new_task("Added", "20240125", "", "")).await.unwrap();
    h.memory.set_available(true);

    assert_eq!(h.service.get_task(id).await.unwrap().title, "After");
    let ids = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.id).collect::<Vec<_>>();
    assert_eq!(ids(h.service.list_tasks(0, "").await.unwrap()), vec![added, id]);
    assert_eq!(ids(h.service.list_tasks(1, "").await.unwrap()), vec![added]);
    assert!(h.memory.get(&format!("task:{id}")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_edit_task_applies_partial_changes() {
    let h = setup_service().await;
    let id = h
        .service
        .add_task(new_task("Run", "20240201", "5k", "d 2"))
        .await
        .unwrap();
    h.service.get_task(id).await.unwrap();

    let edited = h
        .service
        .edit_task(
            id,
            UpdateTaskData {
                title: Some("Run fast".to_string()),
                repeat: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.title, "Run fast");
    assert_eq!(edited.comment, "5k");
    assert!(!edited.is_recurring());
    assert_eq!(h.service.get_task(id).await.unwrap(), edited);
    assert_eq!(stored(&h, id).await, edited);
}

#[tokio::test]
async fn test_edit_task_errors() {
    let h = setup_service().await;
    let id = h.service.add_task(new_task("Keep", "20240201", "", "")).await.unwrap();

    let err = h.service.edit_task(id, UpdateTaskData::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let blank = UpdateTaskData {
        title: Some("  ".to_string()),
        ..Default::default()
    };
    let err = h.service.edit_task(id, blank).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(stored(&h, id).await.title, "Keep");

    let rename = UpdateTaskData {
        title: Some("ghost".to_string()),
        ..Default::default()
    };
    let err = h.service.edit_task(99, rename).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_of_different_fields_both_land() {
    let h = setup_service().await;
    let service = Arc::new(h.service);
    let id = service.add_task(new_task("Plan", "20240201", "", "")).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let edit = if n % 2 == 0 {
                UpdateTaskData {
                    title: Some(format!("Plan {n}")),
                    ..Default::default()
                }
            } else {
                UpdateTaskData {
                    comment: Some(format!("note {n}")),
                    ..Default::default()
                }
            };
            service.edit_task(id, edit).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let task = service.repository().inner.get_by_id(id).await.unwrap();
    assert!(task.title.starts_with("Plan "), "{task:?}");
    assert!(task.comment.starts_with("note "), "{task:?}");
    assert_eq!(service.get_task(id).await.unwrap(), task);
}

#[tokio::test]
async fn test_works_without_cache() {
    let pool = establish_connection(IN_MEMORY).await.unwrap();
    let service = TaskService::new(
        ServiceHandles::new(SqliteRepository::new(pool), NoOpCache)
            .with_clock(FixedClock(day("20240120"))),
    );

    let id = service.add_task(new_task("No cache", "", "", "")).await.unwrap();
    assert_eq!(service.get_task(id).await.unwrap().date, "20240120");
    assert_eq!(service.list_tasks(0, "cache").await.unwrap().len(), 1);
    assert_eq!(service.complete_task(id).await.unwrap(), Completion::Deleted);
    assert_eq!(service.clear_cache().await.unwrap(), 0);
}

#[tokio::test]
async fn test_next_date_defaults_now_to_today() {
    let h = setup_service().await;

    assert_eq!(
        h.service.next_date(Some("20240126"), "20240125", "y").unwrap(),
        "20250125"
    );
    assert_eq!(h.service.next_date(None, "20240113", "d 7").unwrap(), "20240127");
    assert_eq!(h.service.next_date(Some(""), "20240113", "d 7").unwrap(), "20240127");

    let err = h.service.next_date(Some("26.01.2024"), "20240125", "y").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(h.service.next_date(None, "20240110", "").unwrap(), "20240120");
    let err = h.service.next_date(None, "20240125", "d 0").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_and_reads_stay_coherent() {
    let h = setup_service().await;
    let service = Arc::new(h.service);

    let mut handles = Vec::new();
    for n in 0..16 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let id = service
                .add_task(new_task(&format!("job {n}"), "20240201", "", ""))
                .await?;
            let listed = service.list_tasks(0, "job").await?;
            assert!(listed.iter().any(|t| t.id == id));
            let task = service.get_task(id).await?;
            service
                .update_task(Task {
                    comment: format!("done {n}"),
                    ..task
                })
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let all = service.list_tasks(0, "").await.unwrap();
    assert_eq!(all.len(), 16);
    for task in all {
        let cached = service.get_task(task.id).await.unwrap();
        let durable = service.repository().inner.get_by_id(task.id).await.unwrap();
        assert_eq!(cached, durable);
        assert!(cached.comment.starts_with("done "));
    }
}
