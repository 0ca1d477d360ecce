use anyhow::Result;
use scheduler_core::cache::CacheStore;
use scheduler_core::repository::TaskRepository;
use scheduler_core::service::TaskService;

use crate::cli::GetCommand;
use crate::views::table::display_task;

pub async fn get_task<R: TaskRepository, C: CacheStore>(
    service: &TaskService<R, C>,
    command: GetCommand,
    json: bool,
) -> Result<()> {
    let task = service.get_task(command.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        display_task(&task, service.today());
    }
    Ok(())
}
