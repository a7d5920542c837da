//! teamtodo notify on|off|status|test

use serde::Serialize;

use crate::error::Result;
use crate::notice::{self, NotificationAdvisor, Permission, TerminalPlatform};
use crate::output::{emit_success, HumanOutput};

use super::context::{load_profile, output_options, GlobalOptions};
use super::NotifyAction;

pub struct NotifyCommandOptions {
    pub action: NotifyAction,
    pub allow: bool,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct NotifyStatusOutput {
    enabled: bool,
    permission: Permission,
    #[serde(skip_serializing_if = "Option::is_none")]
    shown: Option<bool>,
}

pub fn run(options: NotifyCommandOptions) -> Result<()> {
    let profile = load_profile(&options.global)?;
    let platform = TerminalPlatform::new(profile.storage.clone());
    if options.allow {
        platform.set_permission(Permission::Granted)?;
    }
    let mut advisor = NotificationAdvisor::new(profile.storage.clone(), platform)
        .with_icon(profile.config.notifications.icon.clone());

    let (command, header, shown) = match options.action {
        NotifyAction::On => {
            let permission = advisor.enable()?;
            let header = if permission == Permission::Granted {
                "Notifications enabled"
            } else {
                "Notifications not enabled"
            };
            ("notify on", header, None)
        }
        NotifyAction::Off => {
            advisor.disable()?;
            ("notify off", "Notifications disabled", None)
        }
        NotifyAction::Status => ("notify status", "Notification status", None),
        NotifyAction::Test => {
            let shown = advisor.notify(
                "teamtodo",
                "This is a test notification",
                &notice::NotifyOptions::tagged("teamtodo-test"),
            )?;
            ("notify test", "Test notification", Some(shown))
        }
    };

    let output = NotifyStatusOutput {
        enabled: advisor.is_enabled(),
        permission: advisor.permission(),
        shown,
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("Enabled", if output.enabled { "yes" } else { "no" });
    human.push_summary("Permission", output.permission.as_str());
    if shown == Some(false) || (options.action == NotifyAction::On && !output.enabled) {
        human.push_warning(format!(
            "notification permission is {}",
            output.permission.as_str()
        ));
        if output.permission != Permission::Granted {
            human.push_next_step("teamtodo notify on --allow");
        }
    }

    emit_success(
        output_options(&options.global, false),
        command,
        &output,
        Some(&human),
    )
}
