use clap::Parser;
use owo_colors::{OwoColorize, Style};
use scheduler_core::cache::{CacheStore, MemoryCache, NoOpCache};
use scheduler_core::db;
use scheduler_core::error::{CoreError, ErrorKind};
use scheduler_core::repository::SqliteRepository;
use scheduler_core::service::{ServiceHandles, TaskService};

mod cli;
mod commands;
mod config;
mod logging;
mod views;

use cli::{Cli, Commands};
use config::{CacheMode, Config};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    logging::init(&config.log_level);
    tracing::debug!(?config, "configuration loaded");

    if let Err(e) = run(cli, &config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let db_pool = db::establish_connection(&config.database_path).await?;
    let repository = SqliteRepository::new(db_pool);

    match config.cache {
        CacheMode::Memory => {
            let service = TaskService::new(ServiceHandles::new(repository, MemoryCache::new()));
            dispatch(&service, cli, config).await
        }
        CacheMode::None => {
            let service = TaskService::new(ServiceHandles::new(repository, NoOpCache));
            dispatch(&service, cli, config).await
        }
    }
}

async fn dispatch<C: CacheStore>(
    service: &TaskService<SqliteRepository, C>,
    cli: Cli,
    config: &Config,
) -> anyhow::Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Add(command) => commands::add::add_task(service, command).await,
        Commands::Get(command) => commands::get::get_task(service, command, json).await,
        Commands::List(command) => {
            commands::list::list_tasks(service, command, config.list_limit, json).await
        }
        Commands::Update(command) => commands::update::update_task(service, command).await,
        Commands::Delete(command) => commands::delete::delete_task(service, command).await,
        Commands::Done(command) => commands::done::complete_task(service, command).await,
        Commands::NextDate(command) => commands::next_date::next_date(service, command),
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    let Some(core_error) = err.downcast_ref::<CoreError>() else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
        return;
    };

    match core_error.kind() {
        ErrorKind::NotFound => {
            eprintln!("{} {}", "Error:".style(error_style), core_error);
        }
        ErrorKind::InvalidArgument => {
            eprintln!(
                "{} {}: {}",
                "Error:".style(error_style),
                ErrorKind::InvalidArgument,
                core_error.detail().yellow()
            );
        }
        ErrorKind::Internal => {
            eprintln!(
                "{} {}: {}",
                "Error:".style(error_style),
                ErrorKind::Internal,
                core_error.detail()
            );
        }
    }
}
