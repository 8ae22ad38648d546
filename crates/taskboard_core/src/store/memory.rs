use super::{
    DataApi, ListQuery, Page, Record, Relation, RelationKind, Resource, SortOrder, record_id,
};
use crate::dates;
use crate::error::AppError;
use crate::model::TaskStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub next_id: u64,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub collections: BTreeMap<String, Collection>,
}

/// In-process store with the same contract as the CMS: ids and timestamps
/// are assigned on create, enumerations are validated, deleting a task
/// deletes its comments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<StoreState>,
    calls: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: RefCell::new(state),
            calls: Cell::new(0),
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Number of operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Inserts a record as-is, keeping its id when it has one. Meant for
    /// seeding users and customers, which this system never creates.
    pub fn insert(&self, resource: Resource, mut record: Record) -> Record {
        let mut state = self.state.borrow_mut();
        let collection = state
            .collections
            .entry(resource.path().to_string())
            .or_default();
        let id = match record_id(&record) {
            Some(id) => id,
            None => collection.next_id.max(1),
        };
        collection.next_id = collection.next_id.max(id + 1);
        record.insert("id".to_string(), Value::from(id));
        collection.records.push(record.clone());
        record
    }

    fn touch(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn populate(&self, state: &StoreState, record: &mut Record, relations: &[Relation]) {
        let Some(owner_id) = record_id(record) else {
            return;
        };

        for relation in relations {
            let targets = state.collections.get(relation.target().path());
            let populated = match relation.kind() {
                RelationKind::ToOne => match record.get(relation.field()).and_then(Value::as_u64) {
                    Some(id) => targets
                        .and_then(|collection| find(collection, id))
                        .map(|target| Value::Object(target.clone()))
                        .unwrap_or(Value::Null),
                    None => continue,
                },
                RelationKind::Inverse { foreign_key } => Value::Array(
                    targets
                        .map(|collection| {
                            collection
                                .records
                                .iter()
                                .filter(|target| {
                                    target.get(foreign_key).and_then(Value::as_u64)
                                        == Some(owner_id)
                                })
                                .cloned()
                                .map(Value::Object)
                                .collect()
                        })
                        .unwrap_or_default(),
                ),
            };
            record.insert(relation.field().to_string(), populated);
        }
    }
}

impl DataApi for MemoryStore {
    fn list(&self, resource: Resource, query: &ListQuery) -> Result<Page, AppError> {
        self.touch();
        let state = self.state.borrow();
        let mut matched: Vec<Record> = state
            .collections
            .get(resource.path())
            .map(|collection| {
                collection
                    .records
                    .iter()
                    .filter(|record| query.filters.iter().all(|filter| filter.matches(record)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for sort in query.sort.iter().rev() {
            matched.sort_by(|left, right| {
                let ordering = compare_values(left.get(&sort.field), right.get(&sort.field));
                match sort.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let total = matched.len() as u64;
        let mut records: Vec<Record> = matched
            .into_iter()
            .skip(query.pagination.offset())
            .take(query.pagination.page_size as usize)
            .collect();
        for record in &mut records {
            self.populate(&state, record, &query.populate);
        }

        Ok(Page { records, total })
    }

    fn get(&self, resource: Resource, id: u64, populate: &[Relation]) -> Result<Record, AppError> {
        self.touch();
        let state = self.state.borrow();
        let mut record = state
            .collections
            .get(resource.path())
            .and_then(|collection| find(collection, id))
            .cloned()
            .ok_or_else(|| not_found(resource, id))?;
        self.populate(&state, &mut record, populate);
        Ok(record)
    }

    fn create(&self, resource: Resource, mut values: Record) -> Result<Record, AppError> {
        self.touch();
        values.remove("id");
        validate(resource, &values)?;

        let now = Value::from(dates::now_rfc3339()?);
        let mut state = self.state.borrow_mut();
        let collection = state
            .collections
            .entry(resource.path().to_string())
            .or_default();
        let id = collection.next_id.max(1);
        collection.next_id = id + 1;

        values.insert("id".to_string(), Value::from(id));
        values.insert("createdAt".to_string(), now.clone());
        values.insert("updatedAt".to_string(), now);
        collection.records.push(values.clone());
        Ok(values)
    }

    fn update(&self, resource: Resource, id: u64, values: Record) -> Result<Record, AppError> {
        self.touch();
        validate(resource, &values)?;

        let now = Value::from(dates::now_rfc3339()?);
        let mut state = self.state.borrow_mut();
        let record = state
            .collections
            .get_mut(resource.path())
            .and_then(|collection| {
                collection
                    .records
                    .iter_mut()
                    .find(|record| record_id(record) == Some(id))
            })
            .ok_or_else(|| not_found(resource, id))?;

        for (key, value) in values {
            if key == "id" || key == "createdAt" {
                continue;
            }
            record.insert(key, value);
        }
        record.insert("updatedAt".to_string(), now);
        Ok(record.clone())
    }

    fn delete(&self, resource: Resource, id: u64) -> Result<Record, AppError> {
        self.touch();
        let mut state = self.state.borrow_mut();
        let collection = state
            .collections
            .get_mut(resource.path())
            .ok_or_else(|| not_found(resource, id))?;
        let index = collection
            .records
            .iter()
            .position(|record| record_id(record) == Some(id))
            .ok_or_else(|| not_found(resource, id))?;
        let removed = collection.records.remove(index);

        for relation in owned_relations(resource) {
            if let RelationKind::Inverse { foreign_key } = relation.kind()
                && let Some(targets) = state.collections.get_mut(relation.target().path())
            {
                targets
                    .records
                    .retain(|target| target.get(foreign_key).and_then(Value::as_u64) != Some(id));
            }
        }

        Ok(removed)
    }
}

fn owned_relations(resource: Resource) -> &'static [Relation] {
    match resource {
        Resource::TaskManagements => &Relation::TASK_CARD,
        Resource::Comments => &[Relation::Author, Relation::Task],
        Resource::Users | Resource::Customers => &[],
    }
}

fn find(collection: &Collection, id: u64) -> Option<&Record> {
    collection
        .records
        .iter()
        .find(|record| record_id(record) == Some(id))
}

fn not_found(resource: Resource, id: u64) -> AppError {
    AppError::not_found(format!("{resource} {id} not found"))
}

// Mirrors the content-type rules the CMS enforces on write.
fn validate(resource: Resource, values: &Record) -> Result<(), AppError> {
    match resource {
        Resource::TaskManagements => {
            if let Some(status) = values.get("status")
                && !status.is_null()
            {
                let known = TaskStatus::ALL
                    .iter()
                    .any(|candidate| status.as_str() == Some(candidate.label()));
                if !known {
                    return Err(AppError::api(400, format!("status must be one of the enumeration values, got {status}")));
                }
            }
            if let Some(priority) = values.get("priority")
                && !priority.is_null()
                && !matches!(priority.as_str(), Some("Low" | "Medium" | "High"))
            {
                return Err(AppError::api(400, format!("priority must be one of the enumeration values, got {priority}")));
            }
            Ok(())
        }
        Resource::Comments => {
            let content = values.get("content").and_then(Value::as_str).unwrap_or("");
            if content.trim().is_empty() {
                return Err(AppError::api(400, "content must be defined"));
            }
            Ok(())
        }
        Resource::Users | Resource::Customers => Ok(()),
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(left)), Some(Value::Number(right))) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(left)), Some(Value::String(right))) => left.cmp(right),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::store::{DataApi, Filter, ListQuery, Record, Relation, Resource, SortOrder};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_assigns_ids_and_timestamps() {
        let store = MemoryStore::new();
        let first = store
            .create(Resource::TaskManagements, record(json!({ "issueDescription": "a", "id": 99 })))
            .unwrap();
        let second = store
            .create(Resource::TaskManagements, record(json!({ "issueDescription": "b" })))
            .unwrap();

        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert!(first["createdAt"].is_string());
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn create_rejects_unknown_status() {
        let store = MemoryStore::new();
        let err = store
            .create(Resource::TaskManagements, record(json!({ "status": "Blocked" })))
            .unwrap_err();
        assert_eq!(err.code(), "store_error");
    }

    #[test]
    fn list_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for (description, status) in [("c", "To Do"), ("a", "To Do"), ("b", "Completed"), ("d", "To Do")] {
            store
                .create(
                    Resource::TaskManagements,
                    record(json!({ "issueDescription": description, "status": status })),
                )
                .unwrap();
        }

        let query = ListQuery::new()
            .filter(Filter::eq("status", "To Do"))
            .sort("issueDescription", SortOrder::Asc)
            .page(1, 2);
        let page = store.list(Resource::TaskManagements, &query).unwrap();

        assert_eq!(page.total, 3);
        let names: Vec<_> = page.records.iter().map(|r| r["issueDescription"].clone()).collect();
        assert_eq!(names, [json!("a"), json!("c")]);
    }

    #[test]
    fn get_populates_requested_relations() {
        let store = MemoryStore::new();
        store.insert(Resource::Users, record(json!({ "id": 5, "username": "mai" })));
        let task = store
            .create(
                Resource::TaskManagements,
                record(json!({ "issueDescription": "a", "resolver": 5, "customer": 8 })),
            )
            .unwrap();
        let task_id = task["id"].as_u64().unwrap();
        store
            .create(Resource::Comments, record(json!({ "content": "first", "task": task_id })))
            .unwrap();
        store
            .create(Resource::Comments, record(json!({ "content": "second", "task": task_id })))
            .unwrap();

        let bare = store.get(Resource::TaskManagements, task_id, &[]).unwrap();
        assert_eq!(bare["resolver"], 5);
        assert!(bare.get("comments").is_none());

        let full = store
            .get(Resource::TaskManagements, task_id, &Relation::TASK_CARD)
            .unwrap();
        assert_eq!(full["resolver"]["username"], "mai");
        assert!(full["customer"].is_null());
        let comments = full["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["content"], "first");
        assert_eq!(comments[1]["content"], "second");
    }

    #[test]
    fn update_merges_and_keeps_identity() {
        let store = MemoryStore::new();
        let task = store
            .create(Resource::TaskManagements, record(json!({ "issueDescription": "a" })))
            .unwrap();
        let updated = store
            .update(Resource::TaskManagements, 1, record(json!({ "status": "In Progress", "id": 7 })))
            .unwrap();

        assert_eq!(updated["id"], 1);
        assert_eq!(updated["issueDescription"], "a");
        assert_eq!(updated["status"], "In Progress");
        assert_eq!(updated["createdAt"], task["createdAt"]);
    }

    #[test]
    fn delete_cascades_to_comments() {
        let store = MemoryStore::new();
        store
            .create(Resource::TaskManagements, record(json!({ "issueDescription": "a" })))
            .unwrap();
        store
            .create(Resource::Comments, record(json!({ "content": "x", "task": 1 })))
            .unwrap();

        store.delete(Resource::TaskManagements, 1).unwrap();

        let comments = store.list(Resource::Comments, &ListQuery::new()).unwrap();
        assert_eq!(comments.total, 0);
        let err = store.get(Resource::TaskManagements, 1, &[]).unwrap_err();
        assert!(err.is_not_found());
    }
}
