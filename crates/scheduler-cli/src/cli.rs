use clap::{Parser, Subcommand};

/// Schedule one-off and recurring tasks from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task
    Add(AddCommand),
    /// Show a single task
    Get(GetCommand),
    /// List tasks ordered by date
    List(ListCommand),
    /// Edit fields of an existing task
    Update(UpdateCommand),
    /// Delete a task
    Delete(DeleteCommand),
    /// Mark a task as done: one-off tasks are removed, recurring tasks move to their next date
    Done(DoneCommand),
    /// Compute the next occurrence of a rule without touching any task
    NextDate(NextDateCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// Date as YYYYMMDD (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,
    /// Free-form comment
    #[arg(short, long)]
    pub comment: Option<String>,
    /// Recurrence rule
    #[arg(
        short,
        long,
        help = "Recurrence rule: 'd N', 'y', 'w 1,3,5' or 'm 1,-1 [1,6]'"
    )]
    pub repeat: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct GetCommand {
    /// The ID of the task
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Text to look for in title or comment, or a date as DD.MM.YYYY
    pub search: Option<String>,
    /// Maximum number of tasks to show (0 shows all)
    #[arg(short = 'n', long)]
    pub limit: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct UpdateCommand {
    /// The ID of the task to edit
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    /// New date as YYYYMMDD
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub comment: Option<String>,
    #[arg(long, conflicts_with = "comment")]
    pub comment_clear: bool,

    /// New recurrence rule
    #[arg(long)]
    pub repeat: Option<String>,
    /// Turn the task into a one-off task
    #[arg(long, conflicts_with = "repeat")]
    pub repeat_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the task to delete
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct DoneCommand {
    /// The ID of the task to complete
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct NextDateCommand {
    /// Reference day as YYYYMMDD (defaults to today)
    #[arg(long)]
    pub now: Option<String>,
    /// Last date of the task as YYYYMMDD
    #[arg(long)]
    pub date: String,
    /// Recurrence rule; empty means the task does not repeat
    #[arg(long, default_value = "")]
    pub repeat: String,
}
