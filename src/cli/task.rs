//! teamtodo task commands
//!
//! add, list, show, edit, done, reopen, toggle, rm, stats, upcoming, notices

use serde::Serialize;

use crate::error::{Error, FieldErrors, Result};
use crate::events::EventKind;
use crate::notice::{upcoming_deadline_notices, Notice};
use crate::output::{emit_success, HumanOutput};
use crate::query::{self, Page, TaskFilter, TaskStats};
use crate::task::{parse_due_date, Category, Task, TaskDraft, TaskPatch};

use super::context::{
    emit_event, load_team_context, open_event_sink, output_options, GlobalOptions,
};

pub struct AddOptions {
    pub name: String,
    pub due: Option<String>,
    pub category: Option<String>,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: usize,
    pub all: bool,
    pub global: GlobalOptions,
}

pub struct EditOptions {
    pub id: u64,
    pub name: Option<String>,
    pub due: Option<String>,
    pub category: Option<String>,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TaskListOutput {
    team: String,
    #[serde(flatten)]
    page: Page<Task>,
}

#[derive(Serialize)]
struct TaskDeletedOutput {
    id: u64,
    deleted: bool,
}

#[derive(Serialize)]
struct UpcomingOutput {
    days: u32,
    total: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct NoticesOutput {
    total: usize,
    notices: Vec<Notice>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = load_team_context(&options.global)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(&options.global)?;

    let draft = build_draft(&options)?;
    let task = ctx.repo.create(draft)?;

    let event_warning = emit_event(&mut event_sink, EventKind::TaskCreated, &ctx.team, &task);

    let mut human = HumanOutput::new("Task created");
    if let Some(warning) = event_warning {
        human.push_warning(warning);
    }
    push_task_summary(&mut human, &task);

    emit_success(
        output_options(&options.global, events_to_stdout),
        "add",
        &task,
        Some(&human),
    )
}

/// Collect every input problem before reporting, so the user sees them all.
fn build_draft(options: &AddOptions) -> Result<TaskDraft> {
    let mut errors = FieldErrors::new();

    if options.name.trim().is_empty() {
        errors.insert("name", "task name is required");
    }

    let due_date = match options.due.as_deref() {
        None => {
            errors.insert("due_date", "due date is required");
            None
        }
        Some(raw) => merge_field(&mut errors, parse_due_date(raw)),
    };

    let category = match options.category.as_deref() {
        None => None,
        Some(raw) => merge_field(&mut errors, Category::parse_known(raw)),
    };

    errors.into_result()?;
    Ok(TaskDraft {
        name: options.name.clone(),
        due_date,
        category,
    })
}

fn merge_field<T>(errors: &mut FieldErrors, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(Error::Validation(fields)) => {
            for (field, message) in fields.iter() {
                errors.insert(field, message);
            }
            None
        }
        Err(err) => {
            errors.insert("input", err.to_string());
            None
        }
    }
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_team_context(&options.global)?;

    let mut tasks = ctx.repo.list()?;
    query::sort_by_due_date(&mut tasks);

    let filter = TaskFilter {
        category: options.category.clone(),
        search: options.search.clone(),
    };
    let filtered = filter.apply(&tasks);
    let per_page = if options.all {
        filtered.len().max(1)
    } else {
        ctx.profile.config.query.page_size
    };
    let page = query::paginate(&filtered, options.page, per_page);

    let mut human = HumanOutput::new(format!("Tasks for {}", ctx.team.team_code));
    human.push_summary("Total", page.total.to_string());
    if page.total_pages > 1 {
        human.push_summary("Page", format!("{}/{}", page.page, page.total_pages));
    }
    if let Some(category) = filter.category.as_deref() {
        human.push_summary("Category", category.to_string());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        human.push_summary("Search", search.to_string());
    }
    for task in &page.items {
        human.push_detail(format_task_line(task));
    }
    if page.total == 0 {
        if filter.is_empty() {
            human.push_next_step("teamtodo add <name> --due <YYYY-MM-DD>");
        } else {
            human.push_next_step("teamtodo list --category all");
        }
    } else if page.page < page.total_pages {
        human.push_next_step(format!("teamtodo list --page {}", page.page + 1));
    }

    emit_success(
        output_options(&options.global, false),
        "list",
        &TaskListOutput {
            team: ctx.team.team_code.clone(),
            page,
        },
        Some(&human),
    )
}

pub fn run_show(id: u64, global: GlobalOptions) -> Result<()> {
    let ctx = load_team_context(&global)?;
    let task = ctx.repo.get(id)?.ok_or(Error::TaskNotFound(id))?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, &task);
    human.push_summary("Created", task.created_at.to_rfc3339());
    human.push_summary("Updated", task.updated_at.to_rfc3339());

    emit_success(output_options(&global, false), "show", &task, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let ctx = load_team_context(&options.global)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(&options.global)?;

    let patch = TaskPatch {
        name: options.name.clone(),
        due_date: options.due.as_deref().map(parse_due_date).transpose()?,
        category: options
            .category
            .as_deref()
            .map(Category::parse_known)
            .transpose()?,
        completed: None,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass --name, --due or --category".to_string(),
        ));
    }

    let task = ctx.repo.update(options.id, &patch)?;
    let event_warning = emit_event(&mut event_sink, EventKind::TaskUpdated, &ctx.team, &task);

    let mut human = HumanOutput::new("Task updated");
    if let Some(warning) = event_warning {
        human.push_warning(warning);
    }
    push_task_summary(&mut human, &task);

    emit_success(
        output_options(&options.global, events_to_stdout),
        "edit",
        &task,
        Some(&human),
    )
}

pub fn run_set_completed(id: u64, completed: bool, global: GlobalOptions) -> Result<()> {
    let ctx = load_team_context(&global)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(&global)?;

    let task = ctx.repo.set_completed(id, completed)?;
    let command = if completed { "done" } else { "reopen" };
    emit_completion(&global, command, &task, &mut event_sink, events_to_stdout, &ctx.team)
}

pub fn run_toggle(id: u64, global: GlobalOptions) -> Result<()> {
    let ctx = load_team_context(&global)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(&global)?;

    let task = ctx.repo.toggle_completed(id)?;
    emit_completion(&global, "toggle", &task, &mut event_sink, events_to_stdout, &ctx.team)
}

fn emit_completion(
    global: &GlobalOptions,
    command: &str,
    task: &Task,
    event_sink: &mut Option<crate::events::EventSink>,
    events_to_stdout: bool,
    team: &crate::team::TeamContext,
) -> Result<()> {
    let event_warning = emit_event(event_sink, EventKind::TaskUpdated, team, task);

    let header = if task.completed {
        "Task completed"
    } else {
        "Task reopened"
    };
    let mut human = HumanOutput::new(header);
    if let Some(warning) = event_warning {
        human.push_warning(warning);
    }
    push_task_summary(&mut human, task);

    emit_success(
        output_options(global, events_to_stdout),
        command,
        task,
        Some(&human),
    )
}

pub fn run_rm(id: u64, global: GlobalOptions) -> Result<()> {
    let ctx = load_team_context(&global)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(&global)?;

    if !ctx.repo.delete(id)? {
        return Err(Error::TaskNotFound(id));
    }
    let event_warning = emit_event(
        &mut event_sink,
        EventKind::TaskDeleted,
        &ctx.team,
        serde_json::json!({ "id": id }),
    );

    let mut human = HumanOutput::new("Task deleted");
    if let Some(warning) = event_warning {
        human.push_warning(warning);
    }
    human.push_summary("ID", id.to_string());

    emit_success(
        output_options(&global, events_to_stdout),
        "rm",
        &TaskDeletedOutput { id, deleted: true },
        Some(&human),
    )
}

pub fn run_stats(global: GlobalOptions) -> Result<()> {
    let ctx = load_team_context(&global)?;
    let tasks = ctx.repo.list()?;
    let stats = TaskStats::compute(&tasks, query::today(), ctx.profile.config.query.upcoming_days);

    let human = stats_report(&ctx.team.team_code, &stats);
    emit_success(output_options(&global, false), "stats", &stats, Some(&human))
}

pub(crate) fn stats_report(team_code: &str, stats: &TaskStats) -> HumanOutput {
    let mut human = HumanOutput::new(format!("Stats for {team_code}"));
    human.push_summary("Total", stats.total.to_string());
    human.push_summary(
        "Completed",
        format!("{} ({}%)", stats.completed, stats.completion_rate),
    );
    human.push_summary("Due today", stats.due_today.to_string());
    human.push_summary("Overdue", stats.overdue.to_string());
    human.push_summary("Upcoming", stats.upcoming.to_string());
    for category in Category::ALL {
        let count = stats.by_category.get(category.as_str()).copied().unwrap_or(0);
        human.push_detail(format!("{}: {count}", category.label()));
    }
    human
}

pub fn run_upcoming(days: Option<u32>, global: GlobalOptions) -> Result<()> {
    let ctx = load_team_context(&global)?;
    let days = days.unwrap_or(ctx.profile.config.query.upcoming_days);

    let mut tasks = ctx.repo.list()?;
    query::sort_by_due_date(&mut tasks);
    let upcoming: Vec<Task> = query::upcoming(&tasks, query::today(), days)
        .into_iter()
        .cloned()
        .collect();

    let mut human = HumanOutput::new(format!("Due within {days} days"));
    human.push_summary("Total", upcoming.len().to_string());
    for task in &upcoming {
        human.push_detail(format_task_line(task));
    }

    emit_success(
        output_options(&global, false),
        "upcoming",
        &UpcomingOutput {
            days,
            total: upcoming.len(),
            tasks: upcoming,
        },
        Some(&human),
    )
}

pub fn run_notices(global: GlobalOptions) -> Result<()> {
    let ctx = load_team_context(&global)?;
    let tasks = ctx.repo.list()?;
    let notices = upcoming_deadline_notices(&tasks, query::today());

    let mut human = HumanOutput::new("Notices");
    human.push_summary("Total", notices.len().to_string());
    for notice in &notices {
        human.push_detail(format_notice_line(notice));
    }

    emit_success(
        output_options(&global, false),
        "notices",
        &NoticesOutput {
            total: notices.len(),
            notices,
        },
        Some(&human),
    )
}

pub(crate) fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!(
        "[{mark}] {} {} (due {}, {})",
        task.id,
        task.name,
        task.due_date_string(),
        task.category.label()
    )
}

pub(crate) fn format_notice_line(notice: &Notice) -> String {
    format!("{}: {}", notice.title, notice.message)
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.to_string());
    human.push_summary("Name", task.name.clone());
    human.push_summary("Due", task.due_date_string());
    human.push_summary("Category", task.category.label());
    human.push_summary("Completed", if task.completed { "yes" } else { "no" });
}
