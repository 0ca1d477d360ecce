use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use scheduler_core::cache::CacheStore;
use scheduler_core::models::NewTaskData;
use scheduler_core::repository::TaskRepository;
use scheduler_core::service::TaskService;

use crate::cli::AddCommand;
use crate::views::table::display_date;

pub async fn add_task<R: TaskRepository, C: CacheStore>(
    service: &TaskService<R, C>,
    command: AddCommand,
) -> Result<()> {
    let new_task_data = NewTaskData {
        title: command.title,
        date: command.date.unwrap_or_default(),
        comment: command.comment.unwrap_or_default(),
        repeat: command.repeat.unwrap_or_default(),
    };

    let id = service.add_task(new_task_data).await?;
    let added_task = service.get_task(id).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    let kind = if added_task.is_recurring() {
        "recurring task"
    } else {
        "task"
    };
    println!(
        "{} Created {}: {}",
        "✓".style(success_style),
        kind,
        added_task.title.bright_white().bold()
    );
    println!("  {} Task ID: {}", "→".style(info_style), added_task.id.yellow());
    println!("  {} Date: {}", "→".style(info_style), display_date(&added_task.date));
    if added_task.is_recurring() {
        println!("  {} Repeats: {}", "→".style(info_style), added_task.repeat.cyan());
    }

    Ok(())
}
