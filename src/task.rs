//! Task records and the inputs that create or change them.
//!
//! A team's tasks are stored as one JSON array under `team_<code>_tasks`.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, FieldErrors, Result};

/// Date format used for `due_date` on disk and on the command line
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Task category.
///
/// Values outside the four known ones are kept verbatim so they survive a
/// read/write cycle; they only fall back to `Other` for display. Ordering
/// follows display order, with unknown values last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Work,
    Personal,
    Urgent,
    #[default]
    Other,
    Unknown(String),
}

impl Category {
    /// The known categories, in display order
    pub const ALL: [Category; 4] = [
        Category::Work,
        Category::Personal,
        Category::Urgent,
        Category::Other,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Urgent => "urgent",
            Category::Other => "other",
            Category::Unknown(raw) => raw,
        }
    }

    /// Category used for display; unknown values show as `Other`.
    pub fn display_category(&self) -> Category {
        match self {
            Category::Unknown(_) => Category::Other,
            known => known.clone(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self.display_category() {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Urgent => "Urgent",
            _ => "Other",
        }
    }

    /// Parse user input, accepting only the four known names.
    pub fn parse_known(input: &str) -> Result<Self> {
        match Category::from(input.trim().to_ascii_lowercase()) {
            Category::Unknown(raw) => Err(Error::field(
                "category",
                &format!("unknown category '{raw}' (expected work, personal, urgent, other)"),
            )),
            known => Ok(known),
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "work" => Category::Work,
            "personal" => Category::Personal,
            "urgent" => Category::Urgent,
            "other" => Category::Other,
            _ => Category::Unknown(raw),
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        Category::from(raw.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub name: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// `due_date` in its stored `YYYY-MM-DD` form
    pub fn due_date_string(&self) -> String {
        self.due_date.format(DUE_DATE_FORMAT).to_string()
    }
}

/// Parse a `YYYY-MM-DD` date from user input.
pub fn parse_due_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DUE_DATE_FORMAT).map_err(|err| {
        Error::field(
            "due_date",
            &format!("invalid date '{}' (expected YYYY-MM-DD): {err}", input.trim()),
        )
    })
}

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub category: Option<Category>,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            due_date: Some(due_date),
            category: None,
        }
    }

    /// Check required fields; every failure is reported at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "task name is required");
        }
        if self.due_date.is_none() {
            errors.insert("due_date", "due date is required");
        }
        errors.into_result()
    }

    /// Build the stored record. Callers validate first.
    pub(crate) fn into_task(self, id: u64, now: DateTime<Utc>) -> Result<Task> {
        let due_date = self
            .due_date
            .ok_or_else(|| Error::field("due_date", "due date is required"))?;
        Ok(Task {
            id,
            name: self.name.trim().to_string(),
            due_date,
            category: self.category.unwrap_or_default(),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; only provided fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub category: Option<Category>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.due_date.is_none()
            && self.category.is_none()
            && self.completed.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if let Some(name) = self.name.as_deref() {
            if name.trim().is_empty() {
                errors.insert("name", "task name cannot be empty");
            }
        }
        errors.into_result()
    }

    /// Merge onto `task` and re-stamp `updated_at`, never moving it backwards.
    pub(crate) fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(name) = self.name.as_deref() {
            task.name = name.trim().to_string();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(category) = self.category.as_ref() {
            task.category = category.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.updated_at = now.max(task.updated_at);
    }
}

/// Next id for a collection: creation time in milliseconds, bumped past the
/// largest existing id so ids stay unique and increasing.
pub(crate) fn next_task_id(tasks: &[Task], now: DateTime<Utc>) -> u64 {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    match tasks.iter().map(|task| task.id).max() {
        Some(max) => millis.max(max.saturating_add(1)),
        None => millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn sample(id: u64) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        TaskDraft::new("Write report", date(2024, 1, 3))
            .into_task(id, now)
            .expect("task")
    }

    #[test]
    fn unknown_category_survives_serialization() {
        let json = r#"{
            "id": 1,
            "name": "Legacy",
            "due_date": "2024-01-01",
            "category": "errands",
            "completed": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).expect("decode");
        assert_eq!(task.category, Category::Unknown("errands".to_string()));
        assert_eq!(task.category.display_category(), Category::Other);
        assert_eq!(task.category.label(), "Other");

        let encoded = serde_json::to_value(&task).expect("encode");
        assert_eq!(encoded["category"], "errands");
        assert_eq!(encoded["due_date"], "2024-01-01");
    }

    #[test]
    fn missing_category_defaults_to_other() {
        let json = r#"{
            "id": 2,
            "name": "Old",
            "due_date": "2024-02-01",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).expect("decode");
        assert_eq!(task.category, Category::Other);
        assert!(!task.completed);
    }

    #[test]
    fn parse_known_rejects_unknown_input() {
        assert_eq!(Category::parse_known(" Work ").expect("work"), Category::Work);
        let err = Category::parse_known("errands").expect_err("unknown");
        assert!(matches!(err, Error::Validation(ref fields) if fields.get("category").is_some()));
    }

    #[test]
    fn draft_reports_every_missing_field() {
        let draft = TaskDraft {
            name: "   ".to_string(),
            due_date: None,
            category: None,
        };
        let Err(Error::Validation(fields)) = draft.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert!(fields.get("name").is_some());
        assert!(fields.get("due_date").is_some());
    }

    #[test]
    fn draft_defaults_category_and_trims_name() {
        let task = sample(7);
        assert_eq!(task.id, 7);
        assert_eq!(task.name, "Write report");
        assert_eq!(task.category, Category::Other);
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn patch_only_touches_provided_fields() {
        let mut task = sample(1);
        let later = task.updated_at + chrono::Duration::minutes(5);
        let patch = TaskPatch {
            category: Some(Category::Urgent),
            ..TaskPatch::default()
        };
        patch.apply(&mut task, later);

        assert_eq!(task.name, "Write report");
        assert_eq!(task.category, Category::Urgent);
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn patch_never_moves_updated_at_backwards() {
        let mut task = sample(1);
        let before = task.updated_at;
        TaskPatch::completed(true).apply(&mut task, before - chrono::Duration::hours(1));
        assert!(task.completed);
        assert_eq!(task.updated_at, before);
    }

    #[test]
    fn empty_name_patch_is_rejected() {
        let patch = TaskPatch {
            name: Some(" ".to_string()),
            ..TaskPatch::default()
        };
        assert!(matches!(patch.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn next_id_is_unique_within_same_millisecond() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let first = sample(next_task_id(&[], now));
        assert_eq!(first.id, now.timestamp_millis() as u64);

        let second_id = next_task_id(std::slice::from_ref(&first), now);
        assert_eq!(second_id, first.id + 1);
    }

    #[test]
    fn due_date_parsing() {
        assert_eq!(parse_due_date("2024-03-09").expect("date"), date(2024, 3, 9));
        assert!(matches!(parse_due_date("03/09/2024"), Err(Error::Validation(_))));
    }
}
