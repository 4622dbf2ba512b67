use chrono::{Datelike, Local, NaiveDate, Timelike};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::{File, Metadata};
use std::io::{self, Seek, Write};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::naming::archive_file_name;
use crate::{ArchiveSummary, DEFAULT_OUTPUT_DIR, FileEntry};

type Result<T> = std::result::Result<T, ArchiveError>;

/// Packs files from a base directory into `<output_dir>/<DD-MM-YYYY>.zip`.
#[derive(Debug, Clone)]
pub struct Archiver {
    output_dir: PathBuf,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl Archiver {
    /// The output directory must already exist; it is never created here.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Archives `files` (relative to `base_dir`) under today's name and
    /// returns the bare archive file name.
    ///
    /// Each entry must stay under `base_dir`: absolute entries and entries
    /// with `..` fail with [`ArchiveError::HeaderBuildFailed`]. The list
    /// must not repeat an entry; the zip writer cannot store two members
    /// with one name, so repeats fail up front with
    /// [`ArchiveError::DuplicateEntry`] before the output file is touched.
    pub fn create_archive<S: AsRef<str>>(&self, files: &[S], base_dir: &Path) -> Result<String> {
        self.create_summary(files, base_dir)
            .map(|summary| summary.file_name)
    }

    pub fn create_summary<S: AsRef<str>>(
        &self,
        files: &[S],
        base_dir: &Path,
    ) -> Result<ArchiveSummary> {
        self.create_archive_on(Local::now().date_naive(), files, base_dir)
    }

    /// Same as [`Archiver::create_summary`] with a fixed date for the name.
    pub fn create_archive_on<S: AsRef<str>>(
        &self,
        date: NaiveDate,
        files: &[S],
        base_dir: &Path,
    ) -> Result<ArchiveSummary> {
        check_entries(files)?;

        let file_name = archive_file_name(date);
        let path = self.output_dir.join(&file_name);

        let output = File::create(&path).map_err(|source| ArchiveError::OutputCreateFailed {
            path: path.clone(),
            source,
        })?;
        // ZipWriter finalizes on drop; this handle lets a failed run wipe
        // whatever subset got written.
        let guard = output
            .try_clone()
            .map_err(|source| ArchiveError::OutputCreateFailed {
                path: path.clone(),
                source,
            })?;
        let mut writer = ZipWriter::new(output);

        let added: Result<Vec<FileEntry>> = files
            .iter()
            .map(|name| add_file(&mut writer, name.as_ref(), base_dir))
            .collect();
        let entries = match added {
            Ok(entries) => entries,
            Err(err) => {
                drop(writer);
                if let Err(e) = guard.set_len(0) {
                    warn!("Could not truncate {}: {}", path.display(), e);
                }
                return Err(err);
            }
        };

        writer
            .finish()
            .map_err(|source| ArchiveError::FinalizeFailed {
                path: path.clone(),
                source,
            })?;

        info!(
            "Archive created: {} ({} files)",
            path.display(),
            entries.len()
        );

        Ok(ArchiveSummary {
            file_name,
            path,
            entries,
        })
    }
}

/// Convenience wrapper around [`Archiver::create_archive`]; the same entry
/// rules apply, including the rejection of repeated entries.
pub fn create_archive<S: AsRef<str>>(
    files: &[S],
    base_dir: &Path,
    output_dir: &Path,
) -> Result<String> {
    Archiver::new(output_dir).create_archive(files, base_dir)
}

fn check_entries<S: AsRef<str>>(files: &[S]) -> Result<()> {
    let mut seen = HashSet::with_capacity(files.len());
    for name in files {
        let name = name.as_ref();
        check_name(name)?;
        if !seen.insert(name) {
            return Err(ArchiveError::DuplicateEntry {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Entries resolve strictly below the base directory.
fn check_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "empty member name"
    } else if Path::new(name)
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        "absolute path outside the base directory"
    } else if Path::new(name)
        .components()
        .any(|c| c == Component::ParentDir)
    {
        "path escapes the base directory"
    } else {
        return Ok(());
    };

    Err(ArchiveError::HeaderBuildFailed {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

fn add_file<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    name: &str,
    base_dir: &Path,
) -> Result<FileEntry> {
    let file_path = base_dir.join(name);
    let mut input = File::open(&file_path).map_err(|source| ArchiveError::InputOpenFailed {
        path: file_path.clone(),
        source,
    })?;

    let metadata = input
        .metadata()
        .map_err(|source| ArchiveError::MetadataFailed {
            path: file_path.clone(),
            source,
        })?;

    let options = member_options(name, &metadata)?;

    writer
        .start_file(name, options)
        .map_err(|source| ArchiveError::WriterEntryFailed {
            name: name.to_string(),
            source,
        })?;

    let size = io::copy(&mut input, writer).map_err(|source| ArchiveError::CopyFailed {
        name: name.to_string(),
        source,
    })?;

    debug!("  Added: {} ({} bytes)", name, size);

    Ok(FileEntry {
        path: name.to_string(),
        size,
        modified: unix_seconds(&metadata),
    })
}

fn member_options(name: &str, metadata: &Metadata) -> Result<SimpleFileOptions> {
    if !metadata.is_file() {
        return Err(ArchiveError::HeaderBuildFailed {
            name: name.to_string(),
            reason: "not a regular file".to_string(),
        });
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_time(metadata))
        .large_file(metadata.len() >= u64::from(u32::MAX));

    Ok(with_permissions(options, metadata))
}

#[cfg(unix)]
fn with_permissions(options: SimpleFileOptions, metadata: &Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;
    options.unix_permissions(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn with_permissions(options: SimpleFileOptions, _metadata: &Metadata) -> SimpleFileOptions {
    options
}

/// Local modification time; falls back to the zip epoch (1980-01-01) when the
/// time is unavailable or outside the range zip can store.
fn zip_time(metadata: &Metadata) -> zip::DateTime {
    let Ok(modified) = metadata.modified() else {
        return zip::DateTime::default();
    };
    let local: chrono::DateTime<Local> = modified.into();

    let Ok(year) = u16::try_from(local.year()) else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}

fn unix_seconds(metadata: &Metadata) -> Option<u64> {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn sandbox() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("data");
        let out = tmp.path().join("archives");
        fs::create_dir_all(base.join("sub")).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(base.join("a.txt"), b"alpha").unwrap();
        fs::write(base.join("sub/b.txt"), b"bravo bravo bravo").unwrap();
        (tmp, base, out)
    }

    #[test]
    fn writes_deflated_members_in_order() {
        let (_tmp, base, out) = sandbox();
        let summary = Archiver::new(&out)
            .create_archive_on(date(), &["sub/b.txt", "a.txt"], &base)
            .unwrap();

        assert_eq!(summary.file_name, "05-03-2024.zip");
        assert_eq!(summary.path, out.join("05-03-2024.zip"));

        let mut zip = ZipArchive::new(File::open(&summary.path).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);

        let mut first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), "sub/b.txt");
        assert_eq!(first.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        first.read_to_string(&mut content).unwrap();
        assert_eq!(content, "bravo bravo bravo");
        drop(first);

        assert_eq!(zip.by_index(1).unwrap().name(), "a.txt");
    }

    #[test]
    fn summary_reports_sizes() {
        let (_tmp, base, out) = sandbox();
        let summary = Archiver::new(&out)
            .create_archive_on(date(), &["a.txt"], &base)
            .unwrap();

        assert_eq!(summary.entries.len(), 1);
        assert_eq!(summary.entries[0].path, "a.txt");
        assert_eq!(summary.entries[0].size, 5);
        assert!(summary.entries[0].modified.is_some());
    }

    #[test]
    fn duplicates_rejected_before_output_is_created() {
        let (_tmp, base, out) = sandbox();
        let err = Archiver::new(&out)
            .create_archive_on(date(), &["a.txt", "a.txt"], &base)
            .unwrap_err();

        assert!(matches!(err, ArchiveError::DuplicateEntry { ref name } if name == "a.txt"));
        assert!(!out.join("05-03-2024.zip").exists());
    }

    #[test]
    fn directory_entry_fails_header() {
        let (_tmp, base, out) = sandbox();
        let err = Archiver::new(&out)
            .create_archive_on(date(), &["sub"], &base)
            .unwrap_err();

        assert!(matches!(err, ArchiveError::HeaderBuildFailed { .. }));
    }

    #[test]
    fn missing_output_dir_fails_creation() {
        let (tmp, base, _out) = sandbox();
        let err = Archiver::new(tmp.path().join("nowhere"))
            .create_archive_on(date(), &["a.txt"], &base)
            .unwrap_err();

        assert!(matches!(err, ArchiveError::OutputCreateFailed { .. }));
    }

    #[test]
    fn entries_outside_base_fail_header() {
        let (tmp, base, out) = sandbox();
        fs::write(tmp.path().join("secret.txt"), b"outside").unwrap();
        let absolute = tmp.path().join("secret.txt");
        let absolute = absolute.to_str().unwrap();

        for name in [absolute, "../secret.txt", "sub/../../secret.txt", ""] {
            let err = Archiver::new(&out)
                .create_archive_on(date(), &["a.txt", name], &base)
                .unwrap_err();
            assert!(
                matches!(err, ArchiveError::HeaderBuildFailed { name: ref n, .. } if n == name),
                "{name:?}: {err}"
            );
        }
        assert!(!out.join("05-03-2024.zip").exists());
    }

    #[test]
    fn dot_segments_inside_base_are_allowed() {
        let (_tmp, base, out) = sandbox();
        let summary = Archiver::new(&out)
            .create_archive_on(date(), &["./a.txt"], &base)
            .unwrap();
        assert_eq!(summary.entries[0].path, "./a.txt");
    }

    // Writes a sparse file just over 4 GiB; deflating it takes a while.
    #[test]
    #[ignore]
    fn archives_files_larger_than_4_gib() {
        let (_tmp, base, out) = sandbox();
        let size = u64::from(u32::MAX) + 17;
        File::create(base.join("big.bin"))
            .unwrap()
            .set_len(size)
            .unwrap();

        let summary = Archiver::new(&out)
            .create_archive_on(date(), &["big.bin"], &base)
            .unwrap();
        assert_eq!(summary.entries[0].size, size);

        let mut zip = ZipArchive::new(File::open(&summary.path).unwrap()).unwrap();
        assert_eq!(zip.by_index(0).unwrap().size(), size);
    }

    #[cfg(unix)]
    #[test]
    fn keeps_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, base, out) = sandbox();
        fs::set_permissions(base.join("a.txt"), fs::Permissions::from_mode(0o640)).unwrap();

        let summary = Archiver::new(&out)
            .create_archive_on(date(), &["a.txt"], &base)
            .unwrap();
        let mut zip = ZipArchive::new(File::open(&summary.path).unwrap()).unwrap();
        let member = zip.by_index(0).unwrap();
        assert_eq!(member.unix_mode().map(|m| m & 0o777), Some(0o640));
    }
}
