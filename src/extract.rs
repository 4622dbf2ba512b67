use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use filetime::FileTime;
use log::{debug, warn};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use zip::ZipArchive;

use crate::FileEntry;

/// Unpacks `archive` into `dest`, restoring modification times.
///
/// Members whose names would land outside `dest` are skipped.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<Vec<FileEntry>> {
    let mut zip = open(archive)?;
    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    let mut entries = Vec::with_capacity(zip.len());
    for idx in 0..zip.len() {
        let mut member = zip
            .by_index(idx)
            .with_context(|| format!("Failed to read member {idx} of {}", archive.display()))?;

        let Some(relative) = member.enclosed_name() else {
            warn!("Skipping unsafe member name {:?}", member.name());
            continue;
        };
        let file_path = dest.join(relative);

        if member.is_dir() {
            fs::create_dir_all(&file_path)
                .with_context(|| format!("Failed to create {}", file_path.display()))?;
            continue;
        }

        debug!("  Extracting: {}", member.name());
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut out = File::create(&file_path)
            .with_context(|| format!("Failed to create {}", file_path.display()))?;
        io::copy(&mut member, &mut out)
            .with_context(|| format!("Failed to extract {}", member.name()))?;
        drop(out);

        let entry = describe(member.name(), member.size(), member.last_modified());
        if let Some(modified) = entry.modified {
            let mtime = FileTime::from_unix_time(modified as i64, 0);
            if let Err(e) = filetime::set_file_mtime(&file_path, mtime) {
                warn!("Could not restore mtime of {}: {}", file_path.display(), e);
            }
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// Members of `archive` in stored order, without extracting anything.
pub fn list_archive(archive: &Path) -> Result<Vec<FileEntry>> {
    let mut zip = open(archive)?;
    (0..zip.len())
        .map(|idx| {
            zip.by_index(idx)
                .map(|m| describe(m.name(), m.size(), m.last_modified()))
                .with_context(|| format!("Failed to read member {idx} of {}", archive.display()))
        })
        .collect()
}

fn open(archive: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive {}", archive.display()))?;
    ZipArchive::new(file).with_context(|| format!("Not a zip archive: {}", archive.display()))
}

fn describe(name: &str, size: u64, modified: Option<zip::DateTime>) -> FileEntry {
    FileEntry {
        path: name.to_string(),
        size,
        modified: modified.and_then(unix_seconds),
    }
}

/// Zip timestamps carry no zone; they are read as local time, matching how
/// the archiver writes them.
fn unix_seconds(time: zip::DateTime) -> Option<u64> {
    let date = NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )?;
    let local = date
        .and_hms_opt(
            u32::from(time.hour()),
            u32::from(time.minute()),
            u32::from(time.second()),
        )?
        .and_local_timezone(Local)
        .earliest()?;
    u64::try_from(local.timestamp()).ok()
}
