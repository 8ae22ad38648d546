mod comment;
mod task;

pub use comment::Comment;
pub use task::{
    Customer, MAX_DESCRIPTION_LEN, Priority, TaskRef, Task, TaskDraft, TaskId, TaskPatch,
    TaskStatus, User,
};

use serde::{Deserialize, Deserializer};

/// A relation target that the store may hand back either as a bare id or as
/// the expanded entity, depending on whether the relation was populated.
pub(crate) trait Reference: Sized {
    fn from_id(id: u64) -> Self;
}

pub(crate) fn reference<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Reference + Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Id(u64),
        Entity(T),
    }

    let repr = Option::<Repr<T>>::deserialize(deserializer)?;
    Ok(repr.map(|value| match value {
        Repr::Id(id) => T::from_id(id),
        Repr::Entity(entity) => entity,
    }))
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
