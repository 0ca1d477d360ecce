//! # Scheduler Core Library
//!
//! Task storage with rule-based recurrence and a cache-aside read path.
//!
//! ## Features
//!
//! - **Recurrence Rules**: `d N`, `y`, `w list` and `m days [months]` rules
//!   with leap-year and month-end handling
//! - **Durable Store**: SQLite-backed task repository with embedded migrations
//! - **Cache Mirror**: disposable key-value mirror kept coherent on every write
//! - **Graceful Degradation**: cache failures are logged and served from the store
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Task records and date formats
//! - [`repository`]: Task store contract and its SQLite implementation
//! - [`recurrence`]: Rule parsing and next-date calculation
//! - [`cache`]: Key-value cache providers and the typed task mirror
//! - [`service`]: Cache-aside orchestration of reads and writes
//! - [`error`]: Error types and their caller-facing classification
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use scheduler_core::{
//!     cache::MemoryCache, db, models::NewTaskData, repository::SqliteRepository,
//!     service::{ServiceHandles, TaskService},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), scheduler_core::error::CoreError> {
//!     let pool = db::establish_connection("scheduler.db").await?;
//!     let service = TaskService::new(ServiceHandles::new(
//!         SqliteRepository::new(pool),
//!         MemoryCache::new(),
//!     ));
//!
//!     let id = service
//!         .add_task(NewTaskData {
//!             title: "Water the plants".to_string(),
//!             repeat: "d 3".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let task = service.get_task(id).await?;
//!     println!("{} is due on {}", task.title, task.date);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod db;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod service;
