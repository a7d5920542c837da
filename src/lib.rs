//! teamtodo - shared team task lists
//!
//! This library provides the core functionality for the teamtodo CLI:
//! team-scoped task lists kept in a local data directory and shared by
//! every process that opens it.
//!
//! # Core Concepts
//!
//! - **Team**: a free-text code that scopes a task collection; joining one
//!   makes it the active team for the data directory
//! - **Task**: a named item with a due date, category and completion flag
//! - **Sync**: processes watch the data directory and re-read on change
//! - **Notice**: a derived reminder for tasks due today, overdue or due
//!   tomorrow
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `teamtodo.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL event output for external tools
//! - `lock`: File locking and atomic writes
//! - `notice`: Deadline notices, notification preference and platforms
//! - `output`: Human and JSON command output
//! - `query`: Filtering, search and statistics over task lists
//! - `repository`: CRUD over a team's task collection
//! - `storage`: Key-value storage over the data directory
//! - `sync`: Change subscription and periodic refresh
//! - `task`: Task model and validation
//! - `team`: Team context and the active-team session

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod lock;
pub mod notice;
pub mod output;
pub mod query;
pub mod repository;
pub mod storage;
pub mod sync;
pub mod task;
pub mod team;

pub use error::{Error, Result};
pub use repository::TaskRepository;
pub use storage::Storage;
pub use team::TeamContext;
