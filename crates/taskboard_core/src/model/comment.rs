use super::{TaskRef, User, null_as_default, reference};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "reference")]
    pub author: Option<User>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "reference", skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskRef>,
}
