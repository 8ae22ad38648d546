//! Deadline warnings.
//!
//! [`evaluate`] is a pure function of the task list and the current time;
//! the same inputs always give the same warnings. [`WarningLedger`] sits on
//! top of it for callers that re-evaluate on every reload and must not raise
//! the same warning twice.

use crate::dates;
use crate::model::{Task, TaskId, TaskStatus};
use serde::Serialize;
use std::collections::HashSet;
use time::{Duration, OffsetDateTime};
use tracing::warn;

pub const DEFAULT_APPROACH_DAYS: i64 = 2;
/// Longest approach window, about a century.
pub const MAX_APPROACH_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePolicy {
    pub approach_window: Duration,
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_APPROACH_DAYS)
    }
}

impl DeadlinePolicy {
    /// Clamps `days` into `0..=MAX_APPROACH_DAYS`.
    pub fn from_days(days: i64) -> Self {
        Self {
            approach_window: Duration::days(days.clamp(0, MAX_APPROACH_DAYS)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Overdue,
    Approaching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WarningKey {
    pub task_id: TaskId,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineWarning {
    pub task_id: TaskId,
    pub description: String,
    pub kind: WarningKind,
    pub due: String,
}

impl DeadlineWarning {
    pub fn key(&self) -> WarningKey {
        WarningKey {
            task_id: self.task_id,
            kind: self.kind,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            WarningKind::Overdue => "Task Overdue",
            WarningKind::Approaching => "Task Approaching Deadline",
        }
    }

    pub fn body(&self) -> String {
        match self.kind {
            WarningKind::Overdue => {
                format!("Task \"{}\" is past its target date", self.description)
            }
            WarningKind::Approaching => {
                format!("Task \"{}\" is nearing its target date", self.description)
            }
        }
    }

    /// Overdue warnings stay on screen until dismissed.
    pub fn persistent(&self) -> bool {
        self.kind == WarningKind::Overdue
    }
}

pub fn evaluate(tasks: &[Task], now: OffsetDateTime, policy: &DeadlinePolicy) -> Vec<DeadlineWarning> {
    tasks
        .iter()
        .filter_map(|task| classify(task, now, policy))
        .collect()
}

fn classify(task: &Task, now: OffsetDateTime, policy: &DeadlinePolicy) -> Option<DeadlineWarning> {
    if task.status == TaskStatus::Completed {
        return None;
    }

    let raw_due = task.tobe_completed_date.as_deref()?;
    let due = match dates::parse_moment(raw_due) {
        Ok(due) => due,
        Err(err) => {
            warn!(task_id = task.id, error = %err, "skipping task with unreadable target date");
            return None;
        }
    };

    let kind = if due < now {
        WarningKind::Overdue
    } else if task.status == TaskStatus::InProgress && due - now <= policy.approach_window {
        WarningKind::Approaching
    } else {
        return None;
    };

    Some(DeadlineWarning {
        task_id: task.id,
        description: task.issue_description.clone(),
        kind,
        due: raw_due.to_string(),
    })
}

#[derive(Debug, Default)]
pub struct WarningLedger {
    seen: HashSet<WarningKey>,
}

impl WarningLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the warnings not raised before and records them as raised.
    pub fn fresh(&mut self, warnings: Vec<DeadlineWarning>) -> Vec<DeadlineWarning> {
        warnings
            .into_iter()
            .filter(|warning| self.seen.insert(warning.key()))
            .collect()
    }

    /// Forgets keys whose condition no longer holds, so the warning comes
    /// back if the condition does.
    pub fn retain_active(&mut self, current: &[DeadlineWarning]) {
        let active: HashSet<WarningKey> = current.iter().map(DeadlineWarning::key).collect();
        self.seen.retain(|key| active.contains(key));
    }

    pub fn forget(&mut self, key: &WarningKey) {
        self.seen.remove(key);
    }

    /// The user closed every warning for this task.
    pub fn dismiss(&mut self, task_id: TaskId) {
        self.seen.retain(|key| key.task_id != task_id);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
