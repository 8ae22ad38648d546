//! Strapi v4 REST backend.
//!
//! Requests follow the CMS query syntax (`filters[status][$eq]=..`,
//! `populate[0]=customer`, ..) and writes are wrapped as `{"data": ..}`.
//! Responses arrive as `{data: {id, attributes}}` envelopes, with every
//! populated relation wrapped the same way; they are flattened into plain
//! records before they leave this module.

use super::{DataApi, ListQuery, Page, Record, Relation, Resource, SortOrder};
use crate::error::AppError;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::network(err.to_string())
    }
}

pub struct StrapiClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl StrapiClient {
    /// `base_url` is the CMS origin; the `/api` prefix is added here.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("api.base_url is required"));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            api_url: format!("{trimmed}/api"),
            token: token.filter(|value| !value.trim().is_empty()),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn collection_url(&self, resource: Resource) -> String {
        format!("{}/{}", self.api_url, resource.path())
    }

    fn entity_url(&self, resource: Resource, id: u64) -> String {
        format!("{}/{}/{id}", self.api_url, resource.path())
    }

    fn send(&self, request: RequestBuilder) -> Result<Value, AppError> {
        let request = match self.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        if status.as_u16() == 404 {
            return Err(AppError::not_found(error_message(&body)));
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "store request failed");
            return Err(AppError::api(status.as_u16(), error_message(&body)));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|err| AppError::invalid_data(err.to_string()))
    }
}

impl DataApi for StrapiClient {
    fn list(&self, resource: Resource, query: &ListQuery) -> Result<Page, AppError> {
        let url = self.collection_url(resource);
        debug!(%resource, page = query.pagination.page, "list");
        let body = self.send(self.http.get(&url).query(&encode_query(query)))?;
        decode_page(body)
    }

    fn get(&self, resource: Resource, id: u64, populate: &[Relation]) -> Result<Record, AppError> {
        let url = self.entity_url(resource, id);
        debug!(%resource, id, "get");
        let body = self.send(self.http.get(&url).query(&encode_populate(populate)))?;
        decode_entity(body)
    }

    fn create(&self, resource: Resource, values: Record) -> Result<Record, AppError> {
        let url = self.collection_url(resource);
        debug!(%resource, "create");
        let payload = serde_json::json!({ "data": values });
        let body = self.send(self.http.post(&url).json(&payload))?;
        decode_entity(body)
    }

    fn update(&self, resource: Resource, id: u64, values: Record) -> Result<Record, AppError> {
        let url = self.entity_url(resource, id);
        debug!(%resource, id, "update");
        let payload = serde_json::json!({ "data": values });
        let body = self.send(self.http.put(&url).json(&payload))?;
        decode_entity(body)
    }

    fn delete(&self, resource: Resource, id: u64) -> Result<Record, AppError> {
        let url = self.entity_url(resource, id);
        debug!(%resource, id, "delete");
        let body = self.send(self.http.delete(&url))?;
        match body {
            Value::Null => {
                let mut record = Record::new();
                record.insert("id".to_string(), Value::from(id));
                Ok(record)
            }
            other => decode_entity(other),
        }
    }
}

pub fn encode_query(query: &ListQuery) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for filter in &query.filters {
        let values: Vec<String> = filter
            .values
            .iter()
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect();
        match values.as_slice() {
            [single] => pairs.push((format!("filters[{}][$eq]", filter.field), single.clone())),
            _ => {
                for (index, value) in values.into_iter().enumerate() {
                    pairs.push((format!("filters[{}][$in][{index}]", filter.field), value));
                }
            }
        }
    }

    pairs.push((
        "pagination[page]".to_string(),
        query.pagination.page.max(1).to_string(),
    ));
    pairs.push((
        "pagination[pageSize]".to_string(),
        query.pagination.page_size.to_string(),
    ));

    for (index, sort) in query.sort.iter().enumerate() {
        let order = match sort.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        pairs.push((format!("sort[{index}]"), format!("{}:{order}", sort.field)));
    }

    pairs.extend(encode_populate(&query.populate));
    pairs
}

fn encode_populate(relations: &[Relation]) -> Vec<(String, String)> {
    relations
        .iter()
        .enumerate()
        .map(|(index, relation)| (format!("populate[{index}]"), relation.field().to_string()))
        .collect()
}

fn decode_page(body: Value) -> Result<Page, AppError> {
    let (data, total) = match body {
        // users-permissions answers with a bare array
        Value::Array(items) => {
            let total = items.len() as u64;
            (items, Some(total))
        }
        Value::Object(mut envelope) => {
            let total = envelope
                .get("meta")
                .and_then(|meta| meta.get("pagination"))
                .and_then(|pagination| pagination.get("total"))
                .and_then(Value::as_u64);
            match envelope.remove("data") {
                Some(Value::Array(items)) => (items, total),
                _ => return Err(AppError::invalid_data("list response has no data array")),
            }
        }
        _ => return Err(AppError::invalid_data("list response must be an object")),
    };

    let mut records = Vec::with_capacity(data.len());
    for item in data {
        match flatten_entity(item) {
            Value::Object(record) => records.push(record),
            _ => return Err(AppError::invalid_data("list entry must be an object")),
        }
    }
    let total = total.unwrap_or(records.len() as u64);

    Ok(Page { records, total })
}

fn decode_entity(body: Value) -> Result<Record, AppError> {
    let entity = match body {
        Value::Object(mut envelope) if envelope.contains_key("data") => {
            envelope.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    match flatten_entity(entity) {
        Value::Object(record) => Ok(record),
        Value::Null => Err(AppError::not_found("record not found")),
        _ => Err(AppError::invalid_data("entity response must be an object")),
    }
}

fn flatten_entity(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            let mut flat = Record::new();
            if let Some(Value::Object(attributes)) = object.remove("attributes") {
                if let Some(id) = object.remove("id") {
                    flat.insert("id".to_string(), id);
                }
                for (key, field) in attributes {
                    flat.insert(key, flatten_relation(field));
                }
            } else {
                for (key, field) in object {
                    flat.insert(key, flatten_relation(field));
                }
            }
            Value::Object(flat)
        }
        other => other,
    }
}

fn flatten_relation(value: Value) -> Value {
    match value {
        Value::Object(object)
            if object.contains_key("data")
                && object.keys().all(|key| key == "data" || key == "meta") =>
        {
            match object.into_iter().find(|(key, _)| key == "data") {
                Some((_, Value::Array(items))) => {
                    Value::Array(items.into_iter().map(flatten_entity).collect())
                }
                Some((_, entity)) => flatten_entity(entity),
                None => Value::Null,
            }
        }
        other => other,
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
