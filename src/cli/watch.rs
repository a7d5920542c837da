//! teamtodo watch
//!
//! Follows the active team: re-reads the collection whenever another
//! process (or this one) rewrites it and on a fixed interval, prints the
//! dashboard, and raises a notification once per new deadline notice.

use std::collections::HashSet;
use std::sync::mpsc;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::notice::{upcoming_deadline_notices, Notice, NotificationAdvisor, TerminalPlatform};
use crate::output::emit_success;
use crate::query::{self, TaskStats};
use crate::sync::{PeriodicRefresh, SyncNotifier};

use super::context::{load_team_context, output_options, GlobalOptions};
use super::task::{format_notice_line, stats_report};

pub struct WatchOptions {
    pub limit: Option<usize>,
    pub global: GlobalOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RefreshReason {
    Initial,
    Changed,
    Tick,
}

#[derive(Serialize)]
struct WatchSnapshot {
    team: String,
    reason: RefreshReason,
    stats: TaskStats,
    notices: Vec<Notice>,
    notified: Vec<String>,
}

pub fn run(options: WatchOptions) -> Result<()> {
    let ctx = load_team_context(&options.global)?;
    let storage = ctx.profile.storage.clone();
    let config = ctx.profile.config.clone();

    let (tx, rx) = mpsc::channel();
    let change_tx = tx.clone();
    let subscription = SyncNotifier::new(&storage)
        .with_debounce(Duration::from_millis(config.sync.debounce_ms))
        .subscribe(move || {
            let _ = change_tx.send(RefreshReason::Changed);
        })?;
    let refresh = PeriodicRefresh::start(
        Duration::from_secs(config.sync.refresh_interval_secs),
        move || {
            let _ = tx.send(RefreshReason::Tick);
        },
    )?;

    let mut advisor = NotificationAdvisor::new(storage.clone(), TerminalPlatform::new(storage))
        .with_icon(config.notifications.icon.clone());
    let mut notified: HashSet<String> = HashSet::new();

    let mut render = |reason: RefreshReason| -> Result<()> {
        let tasks = ctx.repo.list_or_empty();
        let today = query::today();
        let stats = TaskStats::compute(&tasks, today, config.query.upcoming_days);
        let notices = upcoming_deadline_notices(&tasks, today);

        let mut raised = Vec::new();
        if advisor.is_enabled() {
            for notice in notices.iter().filter(|n| !notified.contains(&n.id)) {
                if advisor.notify_notice(notice)? {
                    raised.push(notice.id.clone());
                }
            }
        }
        notified.extend(raised.iter().cloned());

        let mut human = stats_report(&ctx.team.team_code, &stats);
        for notice in &notices {
            human.push_detail(format_notice_line(notice));
        }

        emit_success(
            output_options(&options.global, false),
            "watch",
            &WatchSnapshot {
                team: ctx.team.team_code.clone(),
                reason,
                stats,
                notices,
                notified: raised,
            },
            Some(&human),
        )
    };

    render(RefreshReason::Initial)?;

    let mut refreshes = 0;
    while options.limit.map_or(true, |limit| refreshes < limit) {
        let Ok(reason) = rx.recv() else {
            break;
        };
        refreshes += 1;
        tracing::debug!(?reason, refreshes, "watch refresh");
        render(reason)?;
    }

    subscription.unsubscribe();
    refresh.stop();
    Ok(())
}
