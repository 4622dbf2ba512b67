use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod archiver;
pub mod collect;
pub mod config;
pub mod error;
pub mod extract;
pub mod naming;

pub use archiver::{Archiver, create_archive};
pub use collect::collect_files;
pub use config::ArchiveConfig;
pub use error::ArchiveError;
pub use extract::{extract_archive, list_archive};
pub use naming::{archive_file_name, today_archive_file_name};

/// Directory archives are written to when nothing else is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "archives";

/// One member of an archive, as written or as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub modified: Option<u64>,
}

/// Result of a single archiving run.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub file_name: String,
    pub path: PathBuf,
    pub entries: Vec<FileEntry>,
}
