//! Resource-oriented data access.
//!
//! Every backend speaks the same five operations over flat JSON records.
//! Relations are requested through [`Relation`] instead of free-form
//! populate strings, so a backend knows how to join them.

pub mod file;
pub mod memory;
pub mod strapi;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use strapi::StrapiClient;

use crate::error::AppError;
use serde_json::Value;
use std::fmt;

pub type Record = serde_json::Map<String, Value>;

pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    TaskManagements,
    Comments,
    Users,
    Customers,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::TaskManagements,
        Resource::Comments,
        Resource::Users,
        Resource::Customers,
    ];

    /// Path segment under `/api`.
    pub fn path(self) -> &'static str {
        match self {
            Self::TaskManagements => "task-managements",
            Self::Comments => "comments",
            Self::Users => "users",
            Self::Customers => "user2s",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|resource| resource.path() == path)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The field holds the id of one target record.
    ToOne,
    /// The targets point back at the owner through `foreign_key`.
    Inverse { foreign_key: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Customer,
    Resolver,
    Comments,
    Author,
    Task,
}

impl Relation {
    pub fn field(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Resolver => "resolver",
            Self::Comments => "comments",
            Self::Author => "author",
            Self::Task => "task",
        }
    }

    pub fn target(self) -> Resource {
        match self {
            Self::Customer => Resource::Customers,
            Self::Resolver | Self::Author => Resource::Users,
            Self::Comments => Resource::Comments,
            Self::Task => Resource::TaskManagements,
        }
    }

    pub fn kind(self) -> RelationKind {
        match self {
            Self::Comments => RelationKind::Inverse { foreign_key: "task" },
            _ => RelationKind::ToOne,
        }
    }

    /// Relations a task card needs in order to render.
    pub const TASK_CARD: [Relation; 3] = [Relation::Customer, Relation::Resolver, Relation::Comments];
}

/// Matches records whose `field` equals any of `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub values: Vec<Value>,
}

impl Filter {
    pub fn eq<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn one_of<F, V, I>(field: F, values: I) -> Self
    where
        F: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record
            .get(&self.field)
            .is_some_and(|value| self.values.contains(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub pagination: Pagination,
    pub populate: Vec<Relation>,
    pub sort: Vec<Sort>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.pagination = Pagination { page, page_size };
        self
    }

    pub fn populate(mut self, relations: &[Relation]) -> Self {
        self.populate.extend_from_slice(relations);
        self
    }

    pub fn sort<F: Into<String>>(mut self, field: F, order: SortOrder) -> Self {
        self.sort.push(Sort {
            field: field.into(),
            order,
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub total: u64,
}

pub trait DataApi {
    fn list(&self, resource: Resource, query: &ListQuery) -> Result<Page, AppError>;

    fn get(&self, resource: Resource, id: u64, populate: &[Relation]) -> Result<Record, AppError>;

    fn create(&self, resource: Resource, values: Record) -> Result<Record, AppError>;

    fn update(&self, resource: Resource, id: u64, values: Record) -> Result<Record, AppError>;

    fn delete(&self, resource: Resource, id: u64) -> Result<Record, AppError>;
}

pub(crate) fn record_id(record: &Record) -> Option<u64> {
    record.get("id").and_then(Value::as_u64)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(record: Record) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}
