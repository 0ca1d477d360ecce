use anyhow::Result;
use scheduler_core::cache::CacheStore;
use scheduler_core::repository::TaskRepository;
use scheduler_core::service::TaskService;

use crate::cli::DeleteCommand;

pub async fn delete_task<R: TaskRepository, C: CacheStore>(
    service: &TaskService<R, C>,
    command: DeleteCommand,
) -> Result<()> {
    service.delete_task(command.id).await?;
    println!("Deleted task {}", command.id);
    Ok(())
}
