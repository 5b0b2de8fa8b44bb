//! Project store settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file; `~` is expanded. Defaults to the user data directory.
    pub path: Option<String>,
}

impl StoreConfig {
    /// Resolve the database path
    pub fn resolved_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(path) => Some(PathBuf::from(shellexpand::tilde(path).into_owned())),
            None => dirs::data_dir().map(|d| d.join("projektflow").join("projects.db")),
        }
    }

    pub fn merge(&mut self, other: Self) {
        if other.path.is_some() {
            self.path = other.path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path() {
        let config = StoreConfig {
            path: Some("/tmp/pf/projects.db".into()),
        };
        assert_eq!(
            config.resolved_path(),
            Some(PathBuf::from("/tmp/pf/projects.db"))
        );
    }

    #[test]
    fn test_tilde_is_expanded() {
        let config = StoreConfig {
            path: Some("~/pf.db".into()),
        };
        let resolved = config.resolved_path().unwrap();
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.ends_with("pf.db"));
    }
}
