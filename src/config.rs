//! On-disk layout configuration for filesystem-coupled pipelines.
//!
//! Persisted as JSON; missing fields fall back to their defaults so older
//! files keep loading.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How stage folders and documents are named under a document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Prefix of stage folders; stage `k` reads `{prefix}{k}`
    pub stage_prefix: String,
    /// Field of a result used as its document name
    pub id_field: String,
    /// Extension of document files, without the dot
    pub extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            stage_prefix: "stage_".to_owned(),
            id_field: "id".to_owned(),
            extension: "json".to_owned(),
        }
    }
}

impl LayoutConfig {
    /// Folder name of stage `index`.
    pub fn stage_dir(&self, index: usize) -> String {
        format!("{}{index}", self.stage_prefix)
    }

    /// Stage number encoded in a folder name, if it follows the layout.
    pub fn stage_index(&self, dir_name: &str) -> Option<usize> {
        dir_name.strip_prefix(&self.stage_prefix)?.parse().ok()
    }

    /// Whether `path` has the document extension.
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension().and_then(|s| s.to_str()) == Some(self.extension.as_str())
    }

    /// Load the layout from `path`, or the defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout config from {}", path.display()))?;

        serde_json::from_str(&contents).context("Failed to parse layout config JSON")
    }

    /// Save the layout to `path`, creating parent folders.
    ///
    /// # Errors
    ///
    /// Returns an error when the folder or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize layout config")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write layout config to {}", path.display()))?;

        Ok(())
    }
}
