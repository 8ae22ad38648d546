use crate::deadline::{DeadlinePolicy, DeadlineWarning, WarningLedger, evaluate};
use crate::error::AppError;
use crate::model::{Customer, Task, TaskDraft, TaskId, TaskPatch, TaskStatus, User};
use crate::notify::{Notifier, activation_argument};
use crate::store::{DataApi, Filter, ListQuery, Record, Relation, Resource, decode};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct NotificationOutcome {
    pub warnings: Vec<DeadlineWarning>,
    pub failures: Vec<NotificationFailure>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub task_id: TaskId,
    pub error: AppError,
}

/// Every task, across all pages, with customer, resolver and comments
/// expanded.
pub fn list_tasks(api: &dyn DataApi, page_size: u32) -> Result<Vec<Task>, AppError> {
    let query = ListQuery::new().populate(&Relation::TASK_CARD);
    list_all(api, Resource::TaskManagements, query, page_size)?
        .into_iter()
        .map(decode)
        .collect()
}

pub fn list_tasks_by_status(
    api: &dyn DataApi,
    status: TaskStatus,
    page_size: u32,
) -> Result<Vec<Task>, AppError> {
    let query = ListQuery::new()
        .filter(Filter::one_of("status", status.wire_labels().iter().copied()))
        .populate(&Relation::TASK_CARD);
    list_all(api, Resource::TaskManagements, query, page_size)?
        .into_iter()
        .map(decode)
        .collect()
}

pub fn get_task(api: &dyn DataApi, id: TaskId) -> Result<Task, AppError> {
    decode(api.get(Resource::TaskManagements, id, &Relation::TASK_CARD)?)
}

pub fn create_task(api: &dyn DataApi, draft: TaskDraft) -> Result<Task, AppError> {
    let values = draft.validated()?.into_record()?;
    let created: Task = decode(api.create(Resource::TaskManagements, values)?)?;
    info!(task_id = created.id, status = %created.status, "task created");
    Ok(created)
}

pub fn update_task(api: &dyn DataApi, id: TaskId, patch: TaskPatch) -> Result<Task, AppError> {
    let values = patch.validated()?.into_record()?;
    let updated: Task = decode(api.update(Resource::TaskManagements, id, values)?)?;
    info!(task_id = id, "task updated");
    Ok(updated)
}

pub fn delete_task(api: &dyn DataApi, id: TaskId) -> Result<Task, AppError> {
    let removed: Task = decode(api.delete(Resource::TaskManagements, id)?)?;
    info!(task_id = id, "task deleted");
    Ok(removed)
}

pub fn list_customers(api: &dyn DataApi, page_size: u32) -> Result<Vec<Customer>, AppError> {
    list_all(api, Resource::Customers, ListQuery::new(), page_size)?
        .into_iter()
        .map(decode)
        .collect()
}

pub fn list_users(api: &dyn DataApi, page_size: u32) -> Result<Vec<User>, AppError> {
    list_all(api, Resource::Users, ListQuery::new(), page_size)?
        .into_iter()
        .map(decode)
        .collect()
}

/// Reloads the task list, evaluates the deadline policy and raises every
/// warning the ledger has not seen yet.
pub fn notify_deadlines(
    api: &dyn DataApi,
    notifier: &dyn Notifier,
    ledger: &mut WarningLedger,
    policy: &DeadlinePolicy,
    now: OffsetDateTime,
    page_size: u32,
) -> Result<NotificationOutcome, AppError> {
    let tasks = list_tasks(api, page_size)?;
    let current = evaluate(&tasks, now, policy);
    ledger.retain_active(&current);
    let fresh = ledger.fresh(current);
    debug!(count = fresh.len(), "deadline warnings to raise");

    let mut warnings = Vec::new();
    let mut failures = Vec::new();

    for warning in fresh {
        let action = activation_argument(warning.task_id);
        match notifier.notify_with_action(&warning, &action) {
            Ok(_) => warnings.push(warning),
            Err(err) => {
                warn!(task_id = warning.task_id, error = %err, "notification failed");
                ledger.forget(&warning.key());
                failures.push(NotificationFailure {
                    task_id: warning.task_id,
                    error: err,
                });
            }
        }
    }

    Ok(NotificationOutcome { warnings, failures })
}

fn list_all(
    api: &dyn DataApi,
    resource: Resource,
    base: ListQuery,
    page_size: u32,
) -> Result<Vec<Record>, AppError> {
    let page_size = page_size.max(1);
    let mut page = 1;
    let mut records = Vec::new();

    loop {
        let query = base.clone().page(page, page_size);
        let result = api.list(resource, &query)?;
        let fetched = result.records.len();
        records.extend(result.records);
        if fetched == 0 || records.len() as u64 >= result.total {
            break;
        }
        page += 1;
    }

    Ok(records)
}
