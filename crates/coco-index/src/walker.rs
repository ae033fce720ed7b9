//! Repository file discovery

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every indexable file under the configured root, sorted
///
/// Honors `.gitignore` files, the exclude list and the include suffixes.
#[must_use]
pub fn collect_files(config: &IndexConfig) -> Vec<PathBuf> {
    let excluded = config.clone();

    let mut builder = WalkBuilder::new(&config.root);
    builder.hidden(false);
    builder.follow_links(false);
    builder.git_ignore(true);
    builder.git_exclude(true);
    builder.require_git(false);
    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        !(is_dir && entry.depth() > 0 && excluded.is_excluded_dir(&entry.file_name().to_string_lossy()))
    });

    let mut files: Vec<PathBuf> = builder
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| config.is_included_file(path))
        .collect();

    files.sort();
    debug!(root = %config.root.display(), files = files.len(), "Collected indexable files");
    files
}

/// Normalize a path to the `/`-separated form stored in chunks
///
/// # Errors
/// Returns [`Error::OutsideRoot`] for absolute paths not under `root`.
pub fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root)
            .map_err(|_| Error::OutsideRoot(path.display().to_string()))?
    } else {
        path
    };

    let key = relative
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_files_applies_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/main.py"), "print('hi')").unwrap();
        fs::write(root.join("README.md"), "# demo").unwrap();
        fs::write(root.join("logo.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "module.exports = 1").unwrap();

        let files = collect_files(&IndexConfig::new(root));
        let keys: Vec<String> = files
            .iter()
            .map(|p| relative_key(root, p).unwrap())
            .collect();

        assert_eq!(keys, vec!["README.md".to_string(), "src/main.py".to_string()]);
    }

    #[test]
    fn test_relative_key() {
        let root = Path::new("/repo");
        assert_eq!(relative_key(root, Path::new("/repo/src/a.rs")).unwrap(), "src/a.rs");
        assert_eq!(relative_key(root, Path::new("./src/a.rs")).unwrap(), "src/a.rs");
        assert!(relative_key(root, Path::new("/elsewhere/a.rs")).is_err());
    }
}
