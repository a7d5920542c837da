//! Command-line interface for teamtodo
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::Result;

mod context;
mod notify;
mod task;
mod team;
mod watch;

pub use context::GlobalOptions;

/// teamtodo - shared task lists for small teams
///
/// Join a team by its code, then add, edit, search and complete the team's
/// tasks. Every process using the same data directory sees the same lists,
/// and `watch` follows changes made elsewhere as they happen.
#[derive(Parser, Debug)]
#[command(name = "teamtodo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "TEAMTODO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Team code to use instead of the joined team
    #[arg(long, global = true, env = "TEAMTODO_TEAM")]
    pub team: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit mutation events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true, env = "TEAMTODO_EVENTS")]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Join a team, making it the active team
    Join {
        /// Team code shared by all members
        #[arg(value_name = "TEAM")]
        code: String,

        /// Display name for this user
        #[arg(long)]
        name: String,
    },

    /// Leave the active team
    Leave,

    /// Show the active team and user
    Whoami,

    /// Add a task
    Add {
        /// Task name
        name: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Category: work, personal, urgent, other
        #[arg(long)]
        category: Option<String>,
    },

    /// List tasks, sorted by due date
    List {
        /// Only tasks in this category (`all` for every category)
        #[arg(short, long)]
        category: Option<String>,

        /// Match task names (case-insensitive) or due dates
        #[arg(short, long)]
        search: Option<String>,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Show every matching task on one page
        #[arg(long)]
        all: bool,
    },

    /// Show one task
    Show {
        /// Task ID
        id: u64,
    },

    /// Change a task's fields
    Edit {
        /// Task ID
        id: u64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,
    },

    /// Mark a task completed
    Done {
        /// Task ID
        id: u64,
    },

    /// Mark a task not completed
    Reopen {
        /// Task ID
        id: u64,
    },

    /// Flip a task's completion
    Toggle {
        /// Task ID
        id: u64,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: u64,
    },

    /// Completion and deadline statistics
    Stats,

    /// Open tasks due within the next few days
    Upcoming {
        /// Horizon in days, today included
        #[arg(long)]
        days: Option<u32>,
    },

    /// Deadline notices: due today, overdue, due tomorrow
    Notices,

    /// Desktop notification preference
    Notify {
        #[arg(value_enum)]
        action: NotifyAction,

        /// Grant notification permission without prompting
        #[arg(long)]
        allow: bool,
    },

    /// Follow the team's tasks, refreshing on every change
    Watch {
        /// Stop after this many refreshes
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    On,
    Off,
    Status,
    Test,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = GlobalOptions {
            data_dir: self.data_dir,
            team: self.team,
            json: self.json,
            quiet: self.quiet,
            events: self.events,
        };

        match self.command {
            Commands::Join { code, name } => team::run_join(team::JoinOptions {
                code,
                name,
                global,
            }),
            Commands::Leave => team::run_leave(global),
            Commands::Whoami => team::run_whoami(global),
            Commands::Add {
                name,
                due,
                category,
            } => task::run_add(task::AddOptions {
                name,
                due,
                category,
                global,
            }),
            Commands::List {
                category,
                search,
                page,
                all,
            } => task::run_list(task::ListOptions {
                category,
                search,
                page,
                all,
                global,
            }),
            Commands::Show { id } => task::run_show(id, global),
            Commands::Edit {
                id,
                name,
                due,
                category,
            } => task::run_edit(task::EditOptions {
                id,
                name,
                due,
                category,
                global,
            }),
            Commands::Done { id } => task::run_set_completed(id, true, global),
            Commands::Reopen { id } => task::run_set_completed(id, false, global),
            Commands::Toggle { id } => task::run_toggle(id, global),
            Commands::Rm { id } => task::run_rm(id, global),
            Commands::Stats => task::run_stats(global),
            Commands::Upcoming { days } => task::run_upcoming(days, global),
            Commands::Notices => task::run_notices(global),
            Commands::Notify { action, allow } => notify::run(notify::NotifyCommandOptions {
                action,
                allow,
                global,
            }),
            Commands::Watch { limit } => watch::run(watch::WatchOptions { limit, global }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "teamtodo",
            "list",
            "--category",
            "work",
            "--json",
            "--data-dir",
            "/tmp/teamtodo",
        ])
        .expect("parse");
        assert!(cli.json);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/teamtodo")));
        let Commands::List { category, page, all, .. } = cli.command else {
            panic!("expected list");
        };
        assert_eq!(category.as_deref(), Some("work"));
        assert_eq!(page, 1);
        assert!(!all);
    }

    #[test]
    fn notify_action_is_restricted() {
        assert!(Cli::try_parse_from(["teamtodo", "notify", "maybe"]).is_err());
        let cli = Cli::try_parse_from(["teamtodo", "notify", "on", "--allow"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Notify {
                action: NotifyAction::On,
                allow: true
            }
        ));
    }
}
