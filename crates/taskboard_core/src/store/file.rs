use super::memory::{MemoryStore, StoreState};
use super::{DataApi, ListQuery, Page, Record, Relation, Resource};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "TASKBOARD_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredCollections {
    schema_version: u32,
    #[serde(flatten)]
    state: StoreState,
}

/// Offline backend: a [`MemoryStore`] written back to a JSON file after
/// every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let state = load_state(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: MemoryStore::from_state(state),
        })
    }

    fn persist(&self) -> Result<(), AppError> {
        save_state(&self.path, &self.inner.snapshot())
    }
}

impl DataApi for FileStore {
    fn list(&self, resource: Resource, query: &ListQuery) -> Result<Page, AppError> {
        self.inner.list(resource, query)
    }

    fn get(&self, resource: Resource, id: u64, populate: &[Relation]) -> Result<Record, AppError> {
        self.inner.get(resource, id, populate)
    }

    fn create(&self, resource: Resource, values: Record) -> Result<Record, AppError> {
        let created = self.inner.create(resource, values)?;
        self.persist()?;
        Ok(created)
    }

    fn update(&self, resource: Resource, id: u64, values: Record) -> Result<Record, AppError> {
        let updated = self.inner.update(resource, id, values)?;
        self.persist()?;
        Ok(updated)
    }

    fn delete(&self, resource: Resource, id: u64) -> Result<Record, AppError> {
        let removed = self.inner.delete(resource, id)?;
        self.persist()?;
        Ok(removed)
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskboard").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskboard")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<StoreState, AppError> {
    if !path.exists() {
        return Ok(StoreState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredCollections =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    for name in stored.state.collections.keys() {
        if Resource::from_path(name).is_none() {
            return Err(AppError::invalid_data(format!("unknown collection '{name}'")));
        }
    }

    Ok(stored.state)
}

pub fn save_state(path: &Path, state: &StoreState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredCollections {
        schema_version: SCHEMA_VERSION,
        state: state.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}
