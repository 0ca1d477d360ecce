use anyhow::Result;
use scheduler_core::cache::CacheStore;
use scheduler_core::repository::TaskRepository;
use scheduler_core::service::TaskService;

use crate::cli::NextDateCommand;

/// Prints the bare `YYYYMMDD` result so it can be used in scripts.
pub fn next_date<R: TaskRepository, C: CacheStore>(
    service: &TaskService<R, C>,
    command: NextDateCommand,
) -> Result<()> {
    let next = service.next_date(command.now.as_deref(), &command.date, &command.repeat)?;
    println!("{next}");
    Ok(())
}
