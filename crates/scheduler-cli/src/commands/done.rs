use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use scheduler_core::cache::CacheStore;
use scheduler_core::models::Completion;
use scheduler_core::repository::TaskRepository;
use scheduler_core::service::TaskService;

use crate::cli::DoneCommand;
use crate::views::table::display_date;

pub async fn complete_task<R: TaskRepository, C: CacheStore>(
    service: &TaskService<R, C>,
    command: DoneCommand,
) -> Result<()> {
    let success_style = Style::new().green().bold();

    match service.complete_task(command.id).await? {
        Completion::Deleted => {
            println!("{} Completed task {}", "✓".style(success_style), command.id);
        }
        Completion::Rescheduled(task) => {
            println!("{} Completed task: '{}'", "✓".style(success_style), task.title);
            println!(
                "  {} Next occurrence: {}",
                "→".blue(),
                display_date(&task.date).yellow()
            );
        }
    }
    Ok(())
}
