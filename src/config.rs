use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::DEFAULT_OUTPUT_DIR;
use crate::collect::collect_files;

/// An archiving job as read from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory the listed files are relative to.
    pub archive_path: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// When absent, every regular file under `archive_path` is archived.
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl ArchiveConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn resolve_files(&self) -> Result<Vec<String>> {
        match &self.files {
            Some(files) => Ok(files.clone()),
            None => collect_files(&self.archive_path, &self.output_dir),
        }
    }
}
