use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

/// Every regular file under `base_dir`, relative to it, `/`-separated and
/// sorted so the member order is stable between runs.
///
/// `output_dir` is pruned from the walk when it sits inside `base_dir`, so
/// earlier archives (and the one being written) are never picked up.
pub fn collect_files(base_dir: &Path, output_dir: &Path) -> Result<Vec<String>> {
    let base = base_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", base_dir.display()))?;
    // A missing output dir has nothing in it to skip.
    let skip = output_dir.canonicalize().ok();

    let mut files = Vec::new();
    let walker = WalkDir::new(&base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| skip.as_deref() != Some(e.path()));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", base_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(&base).with_context(|| {
            format!(
                "{} is outside {}",
                entry.path().display(),
                base_dir.display()
            )
        })?;

        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(name);
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn lists_nested_files_relative_to_base() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub/deeper")).unwrap();
        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("sub/deeper/c.txt"), "c").unwrap();

        let files = collect_files(tmp.path(), &tmp.path().join("archives")).unwrap();
        assert_eq!(files, vec!["a.txt", "b.txt", "sub/deeper/c.txt"]);
    }

    #[test]
    fn skips_output_dir_inside_base() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("archives/old")).unwrap();
        fs::write(tmp.path().join("archives/01-01-2024.zip"), "zip").unwrap();
        fs::write(tmp.path().join("archives/old/02-01-2024.zip"), "zip").unwrap();
        fs::write(tmp.path().join("keep.txt"), "k").unwrap();
        fs::write(tmp.path().join("archives.txt"), "not the output dir").unwrap();

        let files = collect_files(tmp.path(), &tmp.path().join("archives")).unwrap();
        assert_eq!(files, vec!["archives.txt", "keep.txt"]);
    }

    #[test]
    fn output_dir_with_dot_segments_is_still_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("data/out")).unwrap();
        fs::create_dir_all(tmp.path().join("data/sub")).unwrap();
        fs::write(tmp.path().join("data/out/05-03-2024.zip"), "zip").unwrap();
        fs::write(tmp.path().join("data/a.txt"), "a").unwrap();

        let base = tmp.path().join("data");
        let files = collect_files(&base, &base.join("sub/../out")).unwrap();
        assert_eq!(files, vec!["a.txt"]);
    }

    #[test]
    fn missing_base_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(collect_files(&tmp.path().join("absent"), tmp.path()).is_err());
    }
}
