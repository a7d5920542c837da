//! CRUD over one team's task collection.
//!
//! Every mutation is a locked read-modify-write of the whole collection
//! (see [`Storage::mutate_json`]), so concurrent writers in other processes
//! are serialized instead of silently dropping each other's changes. The
//! rewritten file is the change signal other processes pick up through
//! [`crate::sync::SyncNotifier`].

use chrono::Utc;

use crate::error::{Error, Result};
use crate::storage::{Commit, Storage};
use crate::task::{next_task_id, Task, TaskDraft, TaskPatch};
use crate::team::TeamContext;

#[derive(Debug, Clone)]
pub struct TaskRepository {
    storage: Storage,
    key: String,
    team_code: String,
}

impl TaskRepository {
    pub fn new(storage: Storage, team: &TeamContext) -> Self {
        Self {
            storage,
            key: team.tasks_key(),
            team_code: team.team_code.clone(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Storage key of the collection
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn team_code(&self) -> &str {
        &self.team_code
    }

    /// All tasks in stored order. An absent collection is empty.
    pub fn list(&self) -> Result<Vec<Task>> {
        Ok(self.storage.read_json(&self.key)?.unwrap_or_default())
    }

    /// Like [`list`](Self::list) but degrades to an empty list on failure,
    /// for refresh loops that must keep running.
    pub fn list_or_empty(&self) -> Vec<Task> {
        match self.list() {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(team = %self.team_code, error = %err, "reading tasks failed; showing none");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: u64) -> Result<Option<Task>> {
        Ok(self.list()?.into_iter().find(|task| task.id == id))
    }

    /// Validate and append a new task.
    pub fn create(&self, draft: TaskDraft) -> Result<Task> {
        draft.validate()?;

        let task = self.storage.mutate_json(&self.key, |tasks: &mut Vec<Task>| {
            let now = Utc::now();
            let task = draft.into_task(next_task_id(tasks, now), now)?;
            tasks.push(task.clone());
            Ok(Commit::Write(task))
        })?;

        tracing::debug!(team = %self.team_code, id = task.id, "task created");
        Ok(task)
    }

    /// Merge `patch` over the task with `id`.
    ///
    /// Returns `TaskNotFound` without rewriting the collection when the id
    /// does not exist.
    pub fn update(&self, id: u64, patch: &TaskPatch) -> Result<Task> {
        patch.validate()?;

        let task = self.storage.mutate_json(&self.key, |tasks: &mut Vec<Task>| {
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(Error::TaskNotFound(id))?;
            patch.apply(task, Utc::now());
            Ok(Commit::Write(task.clone()))
        })?;

        tracing::debug!(team = %self.team_code, id, "task updated");
        Ok(task)
    }

    /// Remove the task with `id`; `false` (and no write) when absent.
    pub fn delete(&self, id: u64) -> Result<bool> {
        let removed = self.storage.mutate_json(&self.key, |tasks: &mut Vec<Task>| {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            if tasks.len() == before {
                Ok(Commit::Keep(false))
            } else {
                Ok(Commit::Write(true))
            }
        })?;

        if removed {
            tracing::debug!(team = %self.team_code, id, "task deleted");
        }
        Ok(removed)
    }

    pub fn set_completed(&self, id: u64, completed: bool) -> Result<Task> {
        self.update(id, &TaskPatch::completed(completed))
    }

    /// Flip the completion flag inside one locked cycle.
    pub fn toggle_completed(&self, id: u64) -> Result<Task> {
        let task = self.storage.mutate_json(&self.key, |tasks: &mut Vec<Task>| {
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(Error::TaskNotFound(id))?;
            TaskPatch::completed(!task.completed).apply(task, Utc::now());
            Ok(Commit::Write(task.clone()))
        })?;

        tracing::debug!(team = %self.team_code, id, completed = task.completed, "task toggled");
        Ok(task)
    }
}
