//! Team context and the single active-team session slot.
//!
//! Joining a team persists `{ teamCode, userName }` under `team_info`;
//! leaving clears it. There is one active team per data directory. The
//! context is passed explicitly to everything that needs it.

use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, Result};
use crate::storage::{team_tasks_key, Storage, TEAM_INFO_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamContext {
    pub team_code: String,
    pub user_name: String,
}

impl TeamContext {
    /// Build a context from form input; both fields are trimmed and required.
    pub fn new(team_code: &str, user_name: &str) -> Result<Self> {
        let team_code = team_code.trim();
        let user_name = user_name.trim();

        let mut errors = FieldErrors::new();
        if team_code.is_empty() {
            errors.insert("teamCode", "team code is required");
        }
        if user_name.is_empty() {
            errors.insert("userName", "user name is required");
        }
        errors.into_result()?;

        Ok(Self {
            team_code: team_code.to_string(),
            user_name: user_name.to_string(),
        })
    }

    /// Storage key of this team's task collection
    pub fn tasks_key(&self) -> String {
        team_tasks_key(&self.team_code)
    }
}

/// Session transitions over the `team_info` slot.
pub mod session {
    use super::*;

    /// The active team, if any.
    ///
    /// A corrupt slot is reported as an error rather than read as "no team".
    pub fn current(storage: &Storage) -> Result<Option<TeamContext>> {
        storage.read_json(TEAM_INFO_KEY)
    }

    /// Make `team` the active team, replacing any previous one.
    pub fn join(storage: &Storage, team: &TeamContext) -> Result<()> {
        storage.init()?;
        storage.write_json(TEAM_INFO_KEY, team)?;
        tracing::debug!(team = %team.team_code, user = %team.user_name, "joined team");
        Ok(())
    }

    /// Clear the active team; `false` when none was active.
    pub fn leave(storage: &Storage) -> Result<bool> {
        let removed = storage.remove(TEAM_INFO_KEY)?;
        if removed {
            tracing::debug!("left team");
        }
        Ok(removed)
    }
}
