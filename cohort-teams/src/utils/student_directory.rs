// cohort-teams/src/utils/student_directory.rs
use crate::models::{ServiceError, UserRole};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// Entry in the portal's user directory
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl DirectoryEntry {
    pub fn is_active_student(&self) -> bool {
        self.active && self.role == UserRole::Student
    }
}

/// Lookup of users owned by the portal; this service only reads it.
pub trait StudentDirectory: Send + Sync {
    fn find_user(&self, user_id: &str) -> Result<Option<DirectoryEntry>, ServiceError>;
}

/// Directory snapshot held in memory, loaded from a JSON array of entries.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: HashMap<String, DirectoryEntry>,
}

impl StaticDirectory {
    pub fn from_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.id.clone(), entry))
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        if !path.exists() {
            warn!("Student directory {:?} not found, starting with an empty directory", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read student directory {:?}: {:?}", path, e);
            ServiceError::InternalServerError
        })?;
        let entries: Vec<DirectoryEntry> = serde_json::from_str(&content).map_err(|e| {
            error!("Failed to parse student directory {:?}: {:?}", path, e);
            ServiceError::InternalServerError
        })?;

        info!("Loaded {} directory entries from {:?}", entries.len(), path);
        Ok(Self::from_entries(entries))
    }

    pub fn user_count(&self) -> usize {
        self.entries.len()
    }
}

impl StudentDirectory for StaticDirectory {
    fn find_user(&self, user_id: &str) -> Result<Option<DirectoryEntry>, ServiceError> {
        Ok(self.entries.get(user_id).cloned())
    }
}
