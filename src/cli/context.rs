//! Shared plumbing for commands: data directory, config, team and events.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::output::OutputOptions;
use crate::repository::TaskRepository;
use crate::storage::Storage;
use crate::team::{session, TeamContext};

/// User name attached to `--team` overrides when no team was joined
const ANONYMOUS_USER: &str = "anonymous";

/// Flags every command accepts
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub team: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

/// Data directory and configuration, before any team is resolved.
pub(crate) struct Profile {
    pub storage: Storage,
    pub config: Config,
}

pub(crate) fn load_profile(global: &GlobalOptions) -> Result<Profile> {
    let data_dir = config::resolve_data_dir(global.data_dir.as_deref())?;
    let config = Config::load_from_dir(&data_dir);
    let storage = Storage::new(data_dir).with_lock_timeout(config.storage.lock_timeout_ms);
    Ok(Profile { storage, config })
}

/// Everything a team-scoped command needs.
pub(crate) struct TeamCommandContext {
    pub profile: Profile,
    pub team: TeamContext,
    pub repo: TaskRepository,
}

/// Resolve the team from `--team` or the joined session.
pub(crate) fn load_team_context(global: &GlobalOptions) -> Result<TeamCommandContext> {
    let profile = load_profile(global)?;
    let team = resolve_team(&profile.storage, global.team.as_deref())?;
    let repo = TaskRepository::new(profile.storage.clone(), &team);
    Ok(TeamCommandContext {
        profile,
        team,
        repo,
    })
}

fn resolve_team(storage: &Storage, team_override: Option<&str>) -> Result<TeamContext> {
    let current = session::current(storage)?;
    match team_override.map(str::trim).filter(|code| !code.is_empty()) {
        Some(code) => {
            let user = current
                .as_ref()
                .map(|ctx| ctx.user_name.as_str())
                .unwrap_or(ANONYMOUS_USER);
            TeamContext::new(code, user)
        }
        None => current.ok_or(Error::NoActiveTeam),
    }
}

/// Open event sink for `--events`, plus whether it writes to stdout.
pub(crate) fn open_event_sink(global: &GlobalOptions) -> Result<(Option<EventSink>, bool)> {
    let destination = EventDestination::parse(global.events.as_deref());
    let sink = destination.as_ref().map(|dest| dest.open()).transpose()?;
    let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));
    Ok((sink, events_to_stdout))
}

/// Emit one event; a failure becomes a warning for the command output.
pub(crate) fn emit_event<T: Serialize>(
    sink: &mut Option<EventSink>,
    kind: EventKind,
    team: &TeamContext,
    data: T,
) -> Option<String> {
    let sink = sink.as_mut()?;

    let event = match Event::new(kind, Some(team.user_name.clone()))
        .with_team(team.team_code.clone())
        .with_data(data)
    {
        Ok(event) => event,
        Err(err) => return Some(format!("event output failed: {err}")),
    };

    if let Err(err) = sink.emit(&event) {
        return Some(format!("event output failed: {err}"));
    }

    None
}

/// Event lines on stdout take precedence over command output.
pub(crate) fn output_options(global: &GlobalOptions, events_to_stdout: bool) -> OutputOptions {
    OutputOptions {
        json: global.json && !events_to_stdout,
        quiet: global.quiet || events_to_stdout,
    }
}
