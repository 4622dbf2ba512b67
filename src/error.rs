use std::io;
use std::path::PathBuf;

/// Every way an archiving run can fail. All of them abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to create archive {}: {source}", .path.display())]
    OutputCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open input file {}: {source}", .path.display())]
    InputOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read metadata of {}: {source}", .path.display())]
    MetadataFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot build header for member {name:?}: {reason}")]
    HeaderBuildFailed { name: String, reason: String },

    #[error("failed to start member {name:?}: {source}")]
    WriterEntryFailed {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to copy {name:?} into archive: {source}")]
    CopyFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to finalize archive {}: {source}", .path.display())]
    FinalizeFailed {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("duplicate entry {name:?} in file list")]
    DuplicateEntry { name: String },
}
