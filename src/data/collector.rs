use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use glob::{glob, Pattern};
use log::{debug, warn};

use crate::error::{Rs3Error, Rs3Result};

/// Extension of Remasoft measurement files (case-sensitive).
pub const RS3_EXTENSION: &str = "rs3";

/// Bucket key for measurement files sitting directly in the base directory.
pub const ROOT_FOLDER: &str = ".";

/// Folder key → measurement files, each list sorted by path.
pub type FilesByFolder = BTreeMap<String, Vec<PathBuf>>;

/// Recursively find all `.rs3` files below `base` and bucket them by the
/// first path segment relative to `base`.
///
/// Files directly inside `base` go to [`ROOT_FOLDER`]. Each list is sorted by
/// its path text, so `S1-01.rs3` comes before `S1/x.rs3`. Only an unreadable
/// `base` is an error; entries glob cannot read are logged and skipped.
pub fn collect_rs3_files(base: &Path) -> Rs3Result<FilesByFolder> {
    std::fs::read_dir(base).map_err(|e| Rs3Error::io(base, e))?;

    let escaped = Pattern::escape(&base.to_string_lossy());
    let pattern = Path::new(&escaped).join(format!("**/*.{RS3_EXTENSION}"));
    let pattern_str = pattern.to_string_lossy();
    debug!("Searching for files matching pattern: {pattern_str}");

    let mut files_by_folder = FilesByFolder::new();
    for entry in glob(&pattern_str)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if path.is_dir() {
            continue;
        }
        let folder = folder_key(base, &path);
        files_by_folder.entry(folder).or_default().push(path);
    }

    for files in files_by_folder.values_mut() {
        files.sort_by_cached_key(|p| p.to_string_lossy().into_owned());
    }
    debug!(
        "Found {} folder(s) with .rs3 files under {}",
        files_by_folder.len(),
        base.display()
    );
    Ok(files_by_folder)
}

/// First segment of `path`'s parent relative to `base`, or [`ROOT_FOLDER`].
pub fn folder_key(base: &Path, path: &Path) -> String {
    let parent = path.parent().unwrap_or(path);
    let relative = parent.strip_prefix(base).unwrap_or(parent);
    match relative.components().next() {
        Some(Component::Normal(segment)) => segment.to_string_lossy().into_owned(),
        _ => ROOT_FOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "header\n").unwrap();
    }

    #[test]
    fn buckets_by_top_level_subdirectory() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        touch(&base.join("SiteA/f1.rs3"));
        touch(&base.join("SiteA/sub/f2.rs3"));
        touch(&base.join("SiteB/f3.rs3"));
        touch(&base.join("SiteB/notes.txt"));

        let buckets = collect_rs3_files(base).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets["SiteA"],
            vec![base.join("SiteA/f1.rs3"), base.join("SiteA/sub/f2.rs3")]
        );
        assert_eq!(buckets["SiteB"], vec![base.join("SiteB/f3.rs3")]);
    }

    #[test]
    fn files_in_base_use_root_folder_key() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        touch(&base.join("loose.rs3"));
        touch(&base.join("X/inner.rs3"));

        let buckets = collect_rs3_files(base).unwrap();
        assert_eq!(buckets[ROOT_FOLDER], vec![base.join("loose.rs3")]);
        assert_eq!(buckets["X"], vec![base.join("X/inner.rs3")]);
    }

    #[test]
    fn lists_are_sorted_and_extension_is_exact() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        touch(&base.join("S/c.rs3"));
        touch(&base.join("S/a.rs3"));
        touch(&base.join("S/b.RS3"));
        touch(&base.join("S/d.rs30"));

        let buckets = collect_rs3_files(base).unwrap();
        assert_eq!(buckets["S"], vec![base.join("S/a.rs3"), base.join("S/c.rs3")]);
    }

    #[test]
    fn lists_sort_by_path_text() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        touch(&base.join("AB/S1/x.rs3"));
        touch(&base.join("AB/S1-01.rs3"));

        let buckets = collect_rs3_files(base).unwrap();
        assert_eq!(
            buckets["AB"],
            vec![base.join("AB/S1-01.rs3"), base.join("AB/S1/x.rs3")]
        );
    }

    #[test]
    fn directories_named_like_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("S/odd.rs3")).unwrap();
        touch(&base.join("S/odd.rs3/real.rs3"));

        let buckets = collect_rs3_files(base).unwrap();
        assert_eq!(buckets["S"], vec![base.join("S/odd.rs3/real.rs3")]);
    }

    #[test]
    fn missing_base_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = collect_rs3_files(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Rs3Error::Io { .. }));
    }
}
