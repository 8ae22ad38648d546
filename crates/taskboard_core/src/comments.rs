use crate::error::AppError;
use crate::model::{Comment, TaskId};
use crate::store::{DataApi, Record, Relation, Resource, decode};
use serde_json::Value;
use tracing::info;

/// Attaches a comment to a task. Blank content is refused before any
/// request goes out.
pub fn add_comment(
    api: &dyn DataApi,
    task_id: TaskId,
    content: &str,
    author_id: Option<u64>,
) -> Result<Comment, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::invalid_input("comment content must not be empty"));
    }

    let mut values = Record::new();
    values.insert("content".to_string(), Value::from(content));
    values.insert("task".to_string(), Value::from(task_id));
    if let Some(author_id) = author_id {
        values.insert("author".to_string(), Value::from(author_id));
    }

    let created: Comment = decode(api.create(Resource::Comments, values)?)?;
    info!(task_id, comment_id = created.id, "comment added");
    Ok(created)
}

/// The task's comments in the order the store returns them. Authors come
/// back as bare ids.
pub fn list_comments(api: &dyn DataApi, task_id: TaskId) -> Result<Vec<Comment>, AppError> {
    let mut record = api.get(Resource::TaskManagements, task_id, &[Relation::Comments])?;
    let comments = match record.remove(Relation::Comments.field()) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(AppError::invalid_data(format!(
                "task {task_id} has malformed comments: {other}"
            )));
        }
    };

    comments
        .into_iter()
        .map(|item| match item {
            Value::Object(comment) => decode(comment),
            other => Err(AppError::invalid_data(format!(
                "task {task_id} has malformed comment: {other}"
            ))),
        })
        .collect()
}
