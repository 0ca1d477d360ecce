use anyhow::Result;
use scheduler_core::cache::CacheStore;
use scheduler_core::models::UpdateTaskData;
use scheduler_core::repository::TaskRepository;
use scheduler_core::service::TaskService;

use crate::cli::UpdateCommand;
use crate::views::table::display_date;

pub async fn update_task<R: TaskRepository, C: CacheStore>(
    service: &TaskService<R, C>,
    command: UpdateCommand,
) -> Result<()> {
    let update_data = UpdateTaskData {
        title: command.title,
        date: command.date,
        comment: if command.comment_clear {
            Some(String::new())
        } else {
            command.comment
        },
        repeat: if command.repeat_clear {
            Some(String::new())
        } else {
            command.repeat
        },
    };
    let updated_task = service.edit_task(command.id, update_data).await?;

    println!(
        "Updated task {} ({})",
        updated_task.id,
        display_date(&updated_task.date)
    );
    Ok(())
}
