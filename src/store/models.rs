//! Project documents

use crate::workflow::ProjectWorkflow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of the project itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
        }
    }
}

/// A project document as persisted in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub status: ProjectStatus,

    /// Created lazily on first load when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<ProjectWorkflow>,

    /// User ids invited to work on the project
    #[serde(default)]
    pub involved_users: Vec<String>,

    /// User ids managing the project
    #[serde(default)]
    pub project_managers: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            status: ProjectStatus::Active,
            workflow: None,
            involved_users: Vec::new(),
            project_managers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
