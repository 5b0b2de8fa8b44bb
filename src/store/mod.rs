//! Project document store
//!
//! Projects are JSON documents updated with field-level merges: every
//! top-level field in a patch replaces the stored field, everything else is
//! kept. There is no version token, so concurrent writers race and the last
//! write to a field wins.

mod models;
mod schema;
mod sqlite;

pub use models::{Project, ProjectStatus};
pub use sqlite::SqliteStore;

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by a project store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project '{id}' not found")]
    NotFound { id: String },

    #[error("project '{id}' already exists")]
    AlreadyExists { id: String },

    #[error("project '{id}' has a corrupt document")]
    Corrupt { id: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Document store holding project records
pub trait ProjectStore: Send + Sync {
    fn create_project(&self, project: &Project) -> Result<(), StoreError>;

    fn get_project(&self, id: &str) -> Result<Project, StoreError>;

    /// Replace the top-level fields present in `patch`
    fn merge_project(&self, id: &str, patch: Map<String, Value>) -> Result<(), StoreError>;

    fn list_projects(&self) -> Result<Vec<Project>, StoreError>;
}
