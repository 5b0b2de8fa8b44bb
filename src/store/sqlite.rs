//! SQLite-backed project document store

use super::models::Project;
use super::schema::init_schema;
use super::{ProjectStore, StoreError};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Project documents stored as JSON in a single SQLite table
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store database
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        init_schema(&conn)?;

        tracing::debug!(path = %path.display(), "Opened project store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Throwaway store, used by tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn load_document(conn: &Connection, id: &str) -> Result<Option<String>, StoreError> {
        let document = conn
            .query_row(
                "SELECT document FROM projects WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(document)
    }

    fn write(conn: &Connection, project: &Project) -> Result<(), StoreError> {
        let document = serde_json::to_string(project)?;
        conn.execute(
            "UPDATE projects SET name = ?2, status = ?3, document = ?4, updated_at = ?5
             WHERE id = ?1",
            (
                &project.id,
                &project.name,
                project.status.as_str(),
                &document,
                project.updated_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }
}

impl ProjectStore for SqliteStore {
    fn create_project(&self, project: &Project) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if Self::load_document(&conn, &project.id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                id: project.id.clone(),
            });
        }

        let document = serde_json::to_string(project)?;
        conn.execute(
            "INSERT INTO projects (id, name, status, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &project.id,
                &project.name,
                project.status.as_str(),
                &document,
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ),
        )?;

        tracing::info!(project = %project.id, name = %project.name, "Created project");
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Project, StoreError> {
        let conn = self.conn()?;
        let document = Self::load_document(&conn, id)?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        Ok(serde_json::from_str(&document)?)
    }

    fn merge_project(&self, id: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let document = Self::load_document(&conn, id)?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let mut fields = match serde_json::from_str::<Value>(&document)? {
            Value::Object(fields) => fields,
            _ => return Err(StoreError::Corrupt { id: id.to_string() }),
        };

        let keys: Vec<_> = patch.keys().cloned().collect();
        fields.extend(patch);
        fields.insert(
            "updatedAt".into(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );

        // Round-trip through Project so a bad patch never reaches disk
        let project: Project = serde_json::from_value(Value::Object(fields))?;
        Self::write(&conn, &project)?;

        tracing::debug!(project = id, fields = ?keys, "Merged project update");
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT document FROM projects ORDER BY created_at, id")?;
        let documents = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }
}
