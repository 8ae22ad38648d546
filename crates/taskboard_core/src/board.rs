use crate::error::AppError;
use crate::model::{Task, TaskId, TaskStatus};
use crate::store::DataApi;
use crate::task_api;
use crate::workflow::{TransitionPolicy, set_status};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// One column per status, in [`TaskStatus::ALL`] order. Every task sits in
/// exactly one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    columns: Vec<Column>,
}

impl Board {
    pub fn partition(tasks: Vec<Task>) -> Self {
        let mut columns: Vec<Column> = TaskStatus::ALL
            .into_iter()
            .map(|status| Column {
                status,
                tasks: Vec::new(),
            })
            .collect();

        for task in tasks {
            let index = column_index(task.status);
            columns[index].tasks.push(task);
        }

        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, status: TaskStatus) -> &Column {
        &self.columns[column_index(status)]
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|column| column.tasks.len()).sum()
    }

    pub fn locate(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.columns
            .iter()
            .find(|column| column.tasks.iter().any(|task| task.id == task_id))
            .map(|column| column.status)
    }
}

fn column_index(status: TaskStatus) -> usize {
    match status {
        TaskStatus::ToDo => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::Completed => 2,
        TaskStatus::Cancelled => 3,
    }
}

pub fn load_board(api: &dyn DataApi, page_size: u32) -> Result<Board, AppError> {
    Ok(Board::partition(task_api::list_tasks(api, page_size)?))
}

/// A card released over the board. `destination` is the column label, or
/// `None` when the card was dropped outside every column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEvent {
    pub task_id: TaskId,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Moved(Task),
    Ignored,
}

pub fn handle_drop(
    api: &dyn DataApi,
    policy: TransitionPolicy,
    event: &DropEvent,
) -> Result<DropOutcome, AppError> {
    let Some(label) = event.destination.as_deref() else {
        debug!(task_id = event.task_id, "drop outside the board ignored");
        return Ok(DropOutcome::Ignored);
    };

    let status = TaskStatus::parse_label(label)?;
    set_status(api, policy, event.task_id, status).map(DropOutcome::Moved)
}

#[cfg(test)]
mod tests {
    use super::{Board, DropEvent, DropOutcome, handle_drop, load_board};
    use crate::model::{Priority, Task, TaskDraft, TaskStatus};
    use crate::store::{DataApi, MemoryStore, Relation, Resource};
    use crate::task_api::create_task;
    use crate::workflow::TransitionPolicy;

    fn task(id: u64, status: TaskStatus) -> Task {
        Task {
            id,
            issue_description: format!("task {id}"),
            notes: None,
            priority: Priority::Medium,
            status,
            issue_date: None,
            tobe_completed_date: None,
            actual_complete_date: None,
            customer: None,
            resolver: None,
            comments: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn partition_places_every_task_in_exactly_one_column() {
        let statuses = [
            TaskStatus::Completed,
            TaskStatus::ToDo,
            TaskStatus::Cancelled,
            TaskStatus::ToDo,
            TaskStatus::InProgress,
        ];
        let tasks: Vec<Task> = statuses
            .iter()
            .enumerate()
            .map(|(index, status)| task(index as u64 + 1, *status))
            .collect();

        let board = Board::partition(tasks.clone());

        assert_eq!(board.columns().len(), 4);
        assert_eq!(board.task_count(), tasks.len());
        for task in &tasks {
            let holding = board
                .columns()
                .iter()
                .filter(|column| column.tasks.iter().any(|held| held.id == task.id))
                .count();
            assert_eq!(holding, 1);
            assert_eq!(board.locate(task.id), Some(task.status));
        }
        let todo: Vec<_> = board.column(TaskStatus::ToDo).tasks.iter().map(|t| t.id).collect();
        assert_eq!(todo, [2, 4]);
    }

    #[test]
    fn empty_board_still_has_four_columns() {
        let board = Board::partition(Vec::new());
        let labels: Vec<_> = board.columns().iter().map(|column| column.status.label()).collect();
        assert_eq!(labels, ["To Do", "In Progress", "Completed", "Cancelled"]);
        assert_eq!(board.locate(1), None);
    }

    #[test]
    fn drop_moves_task_to_destination_column() {
        let store = MemoryStore::new();
        let created = create_task(&store, TaskDraft::new("Sort parcels")).unwrap();

        let event = DropEvent {
            task_id: created.id,
            destination: Some("In Progress".to_string()),
        };
        let outcome = handle_drop(&store, TransitionPolicy::Unrestricted, &event).unwrap();

        match outcome {
            DropOutcome::Moved(task) => assert_eq!(task.status, TaskStatus::InProgress),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let board = load_board(&store, 25).unwrap();
        assert_eq!(board.locate(created.id), Some(TaskStatus::InProgress));
    }

    #[test]
    fn drop_outside_columns_is_ignored() {
        let store = MemoryStore::new();
        let created = create_task(&store, TaskDraft::new("Sort parcels")).unwrap();
        let before = store.calls();

        let event = DropEvent {
            task_id: created.id,
            destination: None,
        };
        let outcome = handle_drop(&store, TransitionPolicy::Unrestricted, &event).unwrap();

        assert_eq!(outcome, DropOutcome::Ignored);
        assert_eq!(store.calls(), before);
    }

    #[test]
    fn drop_on_unknown_column_fails_before_any_call() {
        let store = MemoryStore::new();
        let before = store.calls();

        let event = DropEvent {
            task_id: 1,
            destination: Some("Archive".to_string()),
        };
        let err = handle_drop(&store, TransitionPolicy::Unrestricted, &event).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(store.calls(), before);
    }

    #[test]
    fn moved_task_keeps_its_comments() {
        let store = MemoryStore::new();
        let created = create_task(&store, TaskDraft::new("Sort parcels")).unwrap();
        let comment = serde_json::json!({ "content": "half done", "task": created.id });
        store
            .create(Resource::Comments, comment.as_object().cloned().unwrap())
            .unwrap();

        let event = DropEvent {
            task_id: created.id,
            destination: Some("Completed".to_string()),
        };
        handle_drop(&store, TransitionPolicy::Unrestricted, &event).unwrap();

        let record = store
            .get(Resource::TaskManagements, created.id, &[Relation::Comments])
            .unwrap();
        assert_eq!(record["comments"].as_array().map(Vec::len), Some(1));
    }
}
