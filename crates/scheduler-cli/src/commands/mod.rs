// Each subcommand of `sched` lives in its own submodule.

pub mod add;
pub mod delete;
pub mod done;
pub mod get;
pub mod list;
pub mod next_date;
pub mod update;
