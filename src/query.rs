//! Pure filtering, search and aggregation over an in-memory task list.
//!
//! Nothing here touches storage or mutates its input. Date derivations take
//! `today` explicitly and compare calendar dates only; use [`today`] to read
//! the local wall clock at call time.

use std::collections::BTreeMap;

use chrono::{Days, Local, NaiveDate};
use serde::Serialize;

use crate::task::{Category, Task};

/// Category filter value meaning "no filter"
pub const ALL_CATEGORIES: &str = "all";

/// Default horizon for [`upcoming`], in days
pub const DEFAULT_UPCOMING_DAYS: u32 = 3;

/// Default list page size
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Local calendar date right now.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Tasks whose stored category equals `category` exactly.
///
/// `None` or `"all"` returns every task. Unknown categories only match their
/// own raw value; there is no fallback mapping.
pub fn filter_by_category<'a>(tasks: &'a [Task], category: Option<&str>) -> Vec<&'a Task> {
    match category {
        None | Some(ALL_CATEGORIES) => tasks.iter().collect(),
        Some(wanted) => tasks
            .iter()
            .filter(|task| task.category.as_str() == wanted)
            .collect(),
    }
}

/// Case-insensitive name match, or raw substring match on the due date.
pub fn search<'a>(tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
    if query.is_empty() {
        return tasks.iter().collect();
    }
    let needle = query.to_lowercase();
    tasks
        .iter()
        .filter(|task| {
            task.name.to_lowercase().contains(&needle) || task.due_date_string().contains(query)
        })
        .collect()
}

/// Percentage of completed tasks, rounded; 0 for an empty list.
pub fn completion_rate(tasks: &[Task]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = tasks.iter().filter(|task| task.completed).count();
    (100.0 * completed as f64 / tasks.len() as f64).round() as u32
}

/// Incomplete tasks due strictly before `today`.
pub fn overdue(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| !task.completed && task.due_date < today)
        .collect()
}

/// Incomplete tasks due on `today`.
pub fn due_today(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| !task.completed && task.due_date == today)
        .collect()
}

/// Incomplete tasks due within `[today, today + days]`, both ends included.
pub fn upcoming(tasks: &[Task], today: NaiveDate, days: u32) -> Vec<&Task> {
    let horizon = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    tasks
        .iter()
        .filter(|task| !task.completed && task.due_date >= today && task.due_date <= horizon)
        .collect()
}

/// Count per known category, in display order. Unknown categories are not
/// counted.
pub fn category_counts(tasks: &[Task]) -> BTreeMap<Category, usize> {
    let mut counts: BTreeMap<Category, usize> =
        Category::ALL.iter().cloned().map(|category| (category, 0)).collect();
    for task in tasks {
        if let Some(count) = counts.get_mut(&task.category) {
            *count += 1;
        }
    }
    counts
}

/// Sort ascending by due date; ties keep their stored order.
pub fn sort_by_due_date(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| task.due_date);
}

/// Category and search filters applied together, category first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.category.as_deref().map_or(true, |c| c == ALL_CATEGORIES)
            && self.search.as_deref().map_or(true, str::is_empty)
    }

    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let by_category: Vec<Task> = filter_by_category(tasks, self.category.as_deref())
            .into_iter()
            .cloned()
            .collect();
        match self.search.as_deref() {
            Some(query) => search(&by_category, query).into_iter().cloned().collect(),
            None => by_category,
        }
    }
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page actually returned
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Slice `items` into pages of `per_page`.
///
/// `page` is 1-based and clamped into range; an empty list is one empty
/// page. A `per_page` of zero is treated as one.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);

    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages,
        total,
    }
}

/// Dashboard numbers for one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub completion_rate: u32,
    pub due_today: usize,
    pub overdue: usize,
    pub upcoming: usize,
    pub by_category: BTreeMap<String, usize>,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], today: NaiveDate, upcoming_days: u32) -> Self {
        Self {
            total: tasks.len(),
            completed: tasks.iter().filter(|task| task.completed).count(),
            completion_rate: completion_rate(tasks),
            due_today: due_today(tasks, today).len(),
            overdue: overdue(tasks, today).len(),
            upcoming: upcoming(tasks, today, upcoming_days).len(),
            by_category: category_counts(tasks)
                .into_iter()
                .map(|(category, count)| (category.as_str().to_string(), count))
                .collect(),
        }
    }
}
