use super::{Comment, Reference, null_as_default, reference};
use crate::dates;
use crate::error::AppError;
use crate::store::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = u64;

pub const MAX_DESCRIPTION_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issue_description: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub tobe_completed_date: Option<String>,
    #[serde(default)]
    pub actual_complete_date: Option<String>,
    #[serde(default, deserialize_with = "reference")]
    pub customer: Option<Customer>,
    #[serde(default, deserialize_with = "reference")]
    pub resolver: Option<User>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do", alias = "To do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Column order of the board.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Every spelling the store may hold for this status, canonical first.
    pub fn wire_labels(self) -> &'static [&'static str] {
        match self {
            Self::ToDo => &["To Do", "To do"],
            Self::InProgress => &["In Progress"],
            Self::Completed => &["Completed"],
            Self::Cancelled => &["Cancelled"],
        }
    }

    /// Accepts the wire labels as well as loose spellings such as
    /// `in-progress` or `TODO`.
    pub fn parse_label(raw: &str) -> Result<Self, AppError> {
        let folded: String = raw
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .map(|ch| ch.to_ascii_lowercase())
            .collect();

        match folded.as_str() {
            "todo" => Ok(Self::ToDo),
            "inprogress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(AppError::invalid_input(format!(
                "unknown status '{}' (expected one of To Do, In Progress, Completed, Cancelled)",
                raw.trim()
            ))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_label(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(AppError::invalid_input(format!(
                "unknown priority '{other}' (expected Low, Medium or High)"
            ))),
        }
    }
}

/// Customer record from the `user2s` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Reference for Customer {
    fn from_id(id: u64) -> Self {
        Self {
            id,
            name: None,
            email: None,
        }
    }
}

/// Account from the users-permissions plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Reference for User {
    fn from_id(id: u64) -> Self {
        Self {
            id,
            username: None,
            email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: TaskId,
}

impl Reference for TaskRef {
    fn from_id(id: u64) -> Self {
        Self { id }
    }
}

/// Values for a new task. Relations are written as bare ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub issue_description: String,
    pub notes: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub issue_date: Option<String>,
    pub tobe_completed_date: Option<String>,
    pub actual_complete_date: Option<String>,
    pub customer: Option<u64>,
    pub resolver: Option<u64>,
}

impl TaskDraft {
    pub fn new<S: Into<String>>(issue_description: S) -> Self {
        Self {
            issue_description: issue_description.into(),
            notes: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
            issue_date: None,
            tobe_completed_date: None,
            actual_complete_date: None,
            customer: None,
            resolver: None,
        }
    }

    /// Trims text fields and normalizes dates to RFC 3339.
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.issue_description = validate_description(&self.issue_description)?;
        self.notes = self
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        self.issue_date = normalize_date("issueDate", self.issue_date)?;
        self.tobe_completed_date = normalize_date("tobeCompletedDate", self.tobe_completed_date)?;
        self.actual_complete_date =
            normalize_date("actualCompleteDate", self.actual_complete_date)?;
        Ok(self)
    }

    pub fn into_record(self) -> Result<Record, AppError> {
        to_record(&self)
    }
}

/// Partial update: only fields that are `Some` are sent. The inner `None` of
/// a clearable field is written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tobe_completed_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_complete_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<Option<u64>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validated(mut self) -> Result<Self, AppError> {
        if self.is_empty() {
            return Err(AppError::invalid_input("nothing to update"));
        }
        if let Some(description) = self.issue_description.as_deref() {
            self.issue_description = Some(validate_description(description)?);
        }
        self.issue_date = normalize_patch_date("issueDate", self.issue_date)?;
        self.tobe_completed_date =
            normalize_patch_date("tobeCompletedDate", self.tobe_completed_date)?;
        self.actual_complete_date =
            normalize_patch_date("actualCompleteDate", self.actual_complete_date)?;
        Ok(self)
    }

    pub fn into_record(self) -> Result<Record, AppError> {
        to_record(&self)
    }
}

fn validate_description(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("issueDescription is required"));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::invalid_input(format!(
            "issueDescription must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_date(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => {
            let parsed = dates::parse_moment(&raw)
                .map_err(|_| AppError::invalid_input(format!("{field} must be ISO-8601")))?;
            Ok(Some(dates::format_moment(parsed)?))
        }
        _ => Ok(None),
    }
}

fn normalize_patch_date(
    field: &str,
    value: Option<Option<String>>,
) -> Result<Option<Option<String>>, AppError> {
    match value {
        Some(inner) => Ok(Some(normalize_date(field, inner)?)),
        None => Ok(None),
    }
}

fn to_record<T: Serialize>(value: &T) -> Result<Record, AppError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::invalid_data("values must serialize to an object")),
        Err(err) => Err(AppError::invalid_data(err.to_string())),
    }
}
