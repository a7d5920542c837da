//! teamtodo join / leave / whoami

use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::team::{session, TeamContext};

use super::context::{emit_event, load_profile, open_event_sink, output_options, GlobalOptions};

pub struct JoinOptions {
    pub code: String,
    pub name: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct LeaveOutput {
    left: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    team: Option<TeamContext>,
}

pub fn run_join(options: JoinOptions) -> Result<()> {
    let profile = load_profile(&options.global)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(&options.global)?;

    let team = TeamContext::new(&options.code, &options.name)?;
    let previous = session::current(&profile.storage).ok().flatten();
    session::join(&profile.storage, &team)?;

    let event_warning = emit_event(&mut event_sink, EventKind::TeamJoined, &team, &team);

    let mut human = HumanOutput::new(format!("Joined team {}", team.team_code));
    if let Some(warning) = event_warning {
        human.push_warning(warning);
    }
    human.push_summary("Team", team.team_code.clone());
    human.push_summary("User", team.user_name.clone());
    if let Some(previous) = previous.filter(|prev| prev.team_code != team.team_code) {
        human.push_summary("Previous team", previous.team_code);
    }
    human.push_next_step("teamtodo add <name> --due <YYYY-MM-DD>");

    emit_success(
        output_options(&options.global, events_to_stdout),
        "join",
        &team,
        Some(&human),
    )
}

pub fn run_leave(global: GlobalOptions) -> Result<()> {
    let profile = load_profile(&global)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(&global)?;

    let current = session::current(&profile.storage).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "active team unreadable; clearing it");
        None
    });
    let left = session::leave(&profile.storage)?;

    let mut human = HumanOutput::new(if left { "Left team" } else { "No active team" });
    if let Some(team) = current.as_ref() {
        if let Some(warning) = emit_event(&mut event_sink, EventKind::TeamLeft, team, team) {
            human.push_warning(warning);
        }
        human.push_summary("Team", team.team_code.clone());
    }
    human.push_next_step("teamtodo join <team> --name <user>");

    emit_success(
        output_options(&global, events_to_stdout),
        "leave",
        &LeaveOutput {
            left,
            team: current,
        },
        Some(&human),
    )
}

pub fn run_whoami(global: GlobalOptions) -> Result<()> {
    let profile = load_profile(&global)?;
    let team = session::current(&profile.storage)?.ok_or(Error::NoActiveTeam)?;

    let mut human = HumanOutput::new(format!("{} @ {}", team.user_name, team.team_code));
    human.push_summary("Data dir", profile.storage.root().display().to_string());

    emit_success(output_options(&global, false), "whoami", &team, Some(&human))
}
