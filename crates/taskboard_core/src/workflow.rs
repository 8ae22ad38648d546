use crate::error::AppError;
use crate::model::{Task, TaskId, TaskPatch, TaskStatus};
use crate::store::{DataApi, Resource, decode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which status moves are legal. The board itself has always allowed any
/// move; `CancelledTerminal` is an opt-in tightening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    #[default]
    Unrestricted,
    CancelledTerminal,
}

impl TransitionPolicy {
    pub fn allows(self, from: TaskStatus, to: TaskStatus) -> bool {
        if from == to {
            return true;
        }
        match self {
            Self::Unrestricted => true,
            Self::CancelledTerminal => from != TaskStatus::Cancelled,
        }
    }

    pub fn check(self, from: TaskStatus, to: TaskStatus) -> Result<(), AppError> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(AppError::invalid_transition(format!(
                "cannot move a task from {from} to {to}"
            )))
        }
    }

    pub fn targets(self, from: TaskStatus) -> Vec<TaskStatus> {
        TaskStatus::ALL
            .into_iter()
            .filter(|to| *to != from && self.allows(from, *to))
            .collect()
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "unrestricted" => Ok(Self::Unrestricted),
            "cancelled_terminal" => Ok(Self::CancelledTerminal),
            other => Err(AppError::invalid_input(format!(
                "unknown transition policy '{other}'"
            ))),
        }
    }
}

/// Moves a task to `new_status` with a single-field update. Nothing is
/// rolled back on failure; the caller still holds the last loaded board.
pub fn set_status(
    api: &dyn DataApi,
    policy: TransitionPolicy,
    task_id: TaskId,
    new_status: TaskStatus,
) -> Result<Task, AppError> {
    let current: Task = decode(api.get(Resource::TaskManagements, task_id, &[])?)?;
    policy.check(current.status, new_status)?;

    let values = TaskPatch::status(new_status).into_record()?;
    let updated: Task = match api.update(Resource::TaskManagements, task_id, values) {
        Ok(record) => decode(record)?,
        Err(err) => {
            warn!(task_id, to = %new_status, error = %err, "status update failed");
            return Err(err);
        }
    };

    info!(task_id, from = %current.status, to = %updated.status, "task moved");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::{TransitionPolicy, set_status};
    use crate::error::AppError;
    use crate::model::{TaskDraft, TaskStatus};
    use crate::store::{DataApi, ListQuery, MemoryStore, Page, Record, Relation, Resource};
    use crate::task_api::{create_task, get_task};
    use std::cell::Cell;

    /// Reads from the inner store and answers every update with a 500.
    struct FailingUpdates {
        inner: MemoryStore,
        updates: Cell<usize>,
    }

    impl DataApi for FailingUpdates {
        fn list(&self, resource: Resource, query: &ListQuery) -> Result<Page, AppError> {
            self.inner.list(resource, query)
        }

        fn get(&self, resource: Resource, id: u64, populate: &[Relation]) -> Result<Record, AppError> {
            self.inner.get(resource, id, populate)
        }

        fn create(&self, resource: Resource, values: Record) -> Result<Record, AppError> {
            self.inner.create(resource, values)
        }

        fn update(&self, _resource: Resource, _id: u64, _values: Record) -> Result<Record, AppError> {
            self.updates.set(self.updates.get() + 1);
            Err(AppError::api(500, "Internal Server Error"))
        }

        fn delete(&self, resource: Resource, id: u64) -> Result<Record, AppError> {
            self.inner.delete(resource, id)
        }
    }

    #[test]
    fn unrestricted_allows_every_move() {
        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                assert!(TransitionPolicy::Unrestricted.allows(from, to));
            }
        }
    }

    #[test]
    fn cancelled_terminal_blocks_leaving_cancelled() {
        let policy = TransitionPolicy::CancelledTerminal;
        assert!(!policy.allows(TaskStatus::Cancelled, TaskStatus::InProgress));
        assert!(policy.allows(TaskStatus::Cancelled, TaskStatus::Cancelled));
        assert!(policy.allows(TaskStatus::Completed, TaskStatus::ToDo));
        assert!(policy.targets(TaskStatus::Cancelled).is_empty());
        assert_eq!(policy.targets(TaskStatus::ToDo).len(), 3);
    }

    #[test]
    fn parse_accepts_config_spellings() {
        assert_eq!(
            TransitionPolicy::parse("Cancelled-Terminal").unwrap(),
            TransitionPolicy::CancelledTerminal
        );
        assert_eq!(TransitionPolicy::parse("strict").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn set_status_persists_and_refetch_agrees() {
        let store = MemoryStore::new();
        let task = create_task(&store, TaskDraft::new("Inspect dock")).unwrap();

        for status in [TaskStatus::InProgress, TaskStatus::Cancelled, TaskStatus::InProgress] {
            let moved = set_status(&store, TransitionPolicy::Unrestricted, task.id, status).unwrap();
            assert_eq!(moved.status, status);
            assert_eq!(get_task(&store, task.id).unwrap().status, status);
        }
    }

    #[test]
    fn set_status_leaves_other_fields_alone() {
        let store = MemoryStore::new();
        let mut draft = TaskDraft::new("Inspect dock");
        draft.notes = Some("bay 3".to_string());
        let task = create_task(&store, draft).unwrap();

        let moved = set_status(&store, TransitionPolicy::Unrestricted, task.id, TaskStatus::Completed).unwrap();

        assert_eq!(moved.notes.as_deref(), Some("bay 3"));
        assert_eq!(moved.issue_description, "Inspect dock");
    }

    #[test]
    fn refused_transition_issues_no_update() {
        let store = MemoryStore::new();
        let mut draft = TaskDraft::new("Inspect dock");
        draft.status = TaskStatus::Cancelled;
        let task = create_task(&store, draft).unwrap();
        let before = store.calls();

        let err = set_status(&store, TransitionPolicy::CancelledTerminal, task.id, TaskStatus::ToDo)
            .unwrap_err();

        assert_eq!(err.code(), "invalid_transition");
        assert_eq!(store.calls() - before, 1);
        assert_eq!(get_task(&store, task.id).unwrap().status, TaskStatus::Cancelled);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let store = MemoryStore::new();
        let err = set_status(&store, TransitionPolicy::Unrestricted, 7, TaskStatus::Completed)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn failed_update_reaches_the_caller_unchanged() {
        let inner = MemoryStore::new();
        let task = create_task(&inner, TaskDraft::new("Inspect dock")).unwrap();
        let api = FailingUpdates {
            inner,
            updates: Cell::new(0),
        };

        let err = set_status(&api, TransitionPolicy::Unrestricted, task.id, TaskStatus::Completed)
            .unwrap_err();

        assert_eq!(err, AppError::api(500, "Internal Server Error"));
        assert_eq!(api.updates.get(), 1);
        assert_eq!(get_task(&api, task.id).unwrap().status, TaskStatus::ToDo);
    }
}
