use anyhow::Result;
use scheduler_core::cache::CacheStore;
use scheduler_core::repository::TaskRepository;
use scheduler_core::service::TaskService;

use crate::cli::ListCommand;
use crate::views::table::display_tasks;

pub async fn list_tasks<R: TaskRepository, C: CacheStore>(
    service: &TaskService<R, C>,
    command: ListCommand,
    default_limit: i64,
    json: bool,
) -> Result<()> {
    let limit = command.limit.unwrap_or(default_limit);
    let search = command.search.unwrap_or_default();

    let tasks = service.list_tasks(limit, &search).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        display_tasks(&tasks, service.today());
    }
    Ok(())
}
