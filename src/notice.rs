//! Deadline notices and desktop-style notifications.
//!
//! Notices are derived from a task list on demand and carry stable ids, so a
//! watcher can tell a new notice from one it already raised. Whether to
//! raise them at all is a global preference stored outside any team, and
//! raising them goes through a [`NotificationPlatform`] that owns the
//! permission state.

use std::io::{self, BufRead, IsTerminal, Write};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{Storage, NOTIFICATION_PERMISSION_KEY, NOTIFICATION_SETTINGS_KEY};
use crate::task::Task;

/// Icon attached to notifications when nothing else is configured
pub const DEFAULT_ICON: &str = "teamtodo.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    DueToday,
    Overdue,
    DueTomorrow,
}

impl NoticeKind {
    /// Suffix used in notice ids
    fn id_suffix(self) -> &'static str {
        match self {
            NoticeKind::DueToday => "today",
            NoticeKind::Overdue => "overdue",
            NoticeKind::DueTomorrow => "tomorrow",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            NoticeKind::DueToday => "Due today",
            NoticeKind::Overdue => "Task overdue",
            NoticeKind::DueTomorrow => "Due tomorrow",
        }
    }

    fn message(self, name: &str) -> String {
        match self {
            NoticeKind::DueToday => format!("Task \"{name}\" is due today"),
            NoticeKind::Overdue => format!("Task \"{name}\" is overdue"),
            NoticeKind::DueTomorrow => format!("Task \"{name}\" is due tomorrow"),
        }
    }

    /// Classify an incomplete task's due date against `today`.
    pub fn classify(due_date: NaiveDate, today: NaiveDate) -> Option<Self> {
        if due_date == today {
            Some(NoticeKind::DueToday)
        } else if due_date < today {
            Some(NoticeKind::Overdue)
        } else if Some(due_date) == today.checked_add_days(Days::new(1)) {
            Some(NoticeKind::DueTomorrow)
        } else {
            None
        }
    }
}

/// A display-ready deadline notice for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// `task-<id>-<today|overdue|tomorrow>`
    pub id: String,
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
    pub task: Task,
}

/// Notices for every incomplete task due today, overdue, or due tomorrow,
/// in task order.
pub fn upcoming_deadline_notices(tasks: &[Task], today: NaiveDate) -> Vec<Notice> {
    tasks
        .iter()
        .filter(|task| !task.completed)
        .filter_map(|task| {
            let kind = NoticeKind::classify(task.due_date, today)?;
            Some(Notice {
                id: format!("task-{}-{}", task.id, kind.id_suffix()),
                kind,
                title: kind.title().to_string(),
                message: kind.message(&task.name),
                task: task.clone(),
            })
        })
        .collect()
}

// =============================================================================
// Preference
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub enabled: bool,
}

/// Whether notifications are switched on. Absent or unreadable settings
/// read as off.
pub fn get_preference(storage: &Storage) -> bool {
    match storage.read_json::<NotificationSettings>(NOTIFICATION_SETTINGS_KEY) {
        Ok(settings) => settings.unwrap_or_default().enabled,
        Err(err) => {
            tracing::warn!(error = %err, "reading notification settings failed; treating as off");
            false
        }
    }
}

pub fn set_preference(storage: &Storage, enabled: bool) -> Result<()> {
    storage.init()?;
    storage.write_json(NOTIFICATION_SETTINGS_KEY, &NotificationSettings { enabled })
}

// =============================================================================
// Platform
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Never asked
    #[default]
    Default,
    Granted,
    Denied,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Default => "default",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        }
    }
}

/// Options passed with every notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifyOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Notifications sharing a tag replace each other
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub silent: bool,
}

impl NotifyOptions {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }
}

/// Something that can show notifications once permitted.
pub trait NotificationPlatform {
    /// Current permission, without prompting
    fn permission(&self) -> Permission;

    /// Ask the user. Platforms that cannot ask report `Denied`.
    fn request_permission(&mut self) -> Result<Permission>;

    fn show(&mut self, title: &str, body: &str, options: &NotifyOptions) -> Result<()>;
}

/// Preference and permission handling on top of a platform.
pub struct NotificationAdvisor<P> {
    storage: Storage,
    platform: P,
    icon: String,
}

impl<P: NotificationPlatform> NotificationAdvisor<P> {
    pub fn new(storage: Storage, platform: P) -> Self {
        Self {
            storage,
            platform,
            icon: DEFAULT_ICON.to_string(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn permission(&self) -> Permission {
        self.platform.permission()
    }

    pub fn is_enabled(&self) -> bool {
        get_preference(&self.storage)
    }

    /// Ask for permission unless the answer is already known.
    pub fn request_permission(&mut self) -> Result<Permission> {
        match self.platform.permission() {
            Permission::Default => {
                let permission = self.platform.request_permission()?;
                tracing::debug!(permission = permission.as_str(), "notification permission requested");
                Ok(permission)
            }
            known => Ok(known),
        }
    }

    /// Show a notification if permitted; `Ok(false)` when it was skipped.
    ///
    /// The configured icon applies unless `options` names its own.
    pub fn notify(&mut self, title: &str, body: &str, options: &NotifyOptions) -> Result<bool> {
        if self.platform.permission() != Permission::Granted {
            return Ok(false);
        }
        let options = NotifyOptions {
            icon: options.icon.clone().or_else(|| Some(self.icon.clone())),
            ..options.clone()
        };
        self.platform.show(title, body, &options)?;
        Ok(true)
    }

    /// Raise a notice, tagged with its id.
    pub fn notify_notice(&mut self, notice: &Notice) -> Result<bool> {
        self.notify(&notice.title, &notice.message, &NotifyOptions::tagged(&notice.id))
    }

    /// Turn notifications on.
    ///
    /// Only persists the preference once permission is granted, then sends a
    /// confirmation notification.
    pub fn enable(&mut self) -> Result<Permission> {
        let permission = self.request_permission()?;
        if permission == Permission::Granted {
            set_preference(&self.storage, true)?;
            self.notify(
                "Notifications enabled",
                "You will be reminded about task deadlines",
                &NotifyOptions::default(),
            )?;
        }
        Ok(permission)
    }

    pub fn disable(&mut self) -> Result<()> {
        set_preference(&self.storage, false)
    }
}

/// Terminal notifications: a bell plus a line on stderr.
///
/// Permission is asked on stdin and remembered under
/// `notification_permission`. Without an interactive stdin the platform
/// counts as unsupported and reports `Denied` without remembering it.
#[derive(Debug, Clone)]
pub struct TerminalPlatform {
    storage: Storage,
}

impl TerminalPlatform {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Record an answer without prompting.
    pub fn set_permission(&self, permission: Permission) -> Result<()> {
        self.storage.init()?;
        self.storage.write_json(NOTIFICATION_PERMISSION_KEY, &permission)
    }

    fn prompt() -> Result<bool> {
        let mut stderr = io::stderr();
        write!(stderr, "Allow teamtodo to show deadline notifications? [y/N] ")?;
        stderr.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl NotificationPlatform for TerminalPlatform {
    fn permission(&self) -> Permission {
        match self.storage.read_json::<Permission>(NOTIFICATION_PERMISSION_KEY) {
            Ok(permission) => permission.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "reading notification permission failed");
                Permission::Default
            }
        }
    }

    fn request_permission(&mut self) -> Result<Permission> {
        if !io::stdin().is_terminal() {
            tracing::debug!("stdin is not a terminal; notifications unsupported");
            return Ok(Permission::Denied);
        }
        let permission = if Self::prompt()? {
            Permission::Granted
        } else {
            Permission::Denied
        };
        self.set_permission(permission)?;
        Ok(permission)
    }

    fn show(&mut self, title: &str, body: &str, options: &NotifyOptions) -> Result<()> {
        let mut stderr = io::stderr();
        if !options.silent {
            write!(stderr, "\x07")?;
        }
        writeln!(stderr, "[{title}] {body}")?;
        tracing::info!(
            title,
            body,
            tag = options.tag.as_deref().unwrap_or(""),
            icon = options.icon.as_deref().unwrap_or(""),
            "notification shown"
        );
        Ok(())
    }
}
