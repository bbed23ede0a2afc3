use std::path::PathBuf;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::fs::operations::{read_locked, write_locked};

/// Remembers project name -> project id pairs that were used before, so that creating a timer for
/// a known project only needs its name. Not involved in timer state.
#[derive(Debug)]
pub struct ProjectRegistry {
    path: PathBuf,
    projects: IndexMap<String, String>,
}

impl ProjectRegistry {
    pub async fn load(path: PathBuf) -> Result<Self> {
        let content = read_locked(&path)
            .await
            .with_context(|| format!("Failed to read project registry {path:?}"))?;

        let projects = match content {
            Some(content) if !content.trim().is_empty() => serde_json::from_str(&content)
                .with_context(|| format!("Project registry {path:?} is not valid JSON"))?,
            Some(_) => IndexMap::new(),
            None => {
                info!("Project registry {path:?} not found");
                IndexMap::new()
            }
        };

        Ok(Self { path, projects })
    }

    pub fn lookup(&self, project_name: &str) -> Option<&str> {
        self.projects.get(project_name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.projects.iter().map(|(name, id)| (name.as_str(), id.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Adds or updates a pair and rewrites the registry file.
    pub async fn record(&mut self, project_name: &str, project_id: &str) -> Result<()> {
        self.projects
            .insert(project_name.to_string(), project_id.to_string());
        let buffer = serde_json::to_vec(&self.projects)?;
        write_locked(&self.path, &buffer)
            .await
            .with_context(|| format!("Failed to write project registry {:?}", self.path))?;
        debug!("Registered project {project_name} as {project_id}");
        Ok(())
    }
}
