//! Workspace confinement for file tools

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// File names that are never read or written by tools
const SENSITIVE_FILE_NAMES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".env.development",
    "credentials",
    "credentials.json",
    ".npmrc",
    ".pypirc",
    ".netrc",
    ".htpasswd",
    "id_rsa",
    "id_ecdsa",
    "id_ed25519",
];

/// Resolve a tool-supplied path against the workspace root
///
/// Relative paths are joined to `root`; absolute paths are accepted only
/// when they already lie under it. `..` components are folded lexically and
/// the nearest existing ancestor is canonicalized, so neither traversal nor
/// a symlink can leave the workspace.
///
/// # Errors
/// [`Error::PermissionDenied`] when the path escapes the root.
pub fn resolve_in_root(root: &Path, path: &str) -> Result<PathBuf> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let requested = Path::new(path);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(outside(path));
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    if !normalized.starts_with(&root) {
        warn!(path = %path, root = %root.display(), "Path outside workspace rejected");
        return Err(outside(path));
    }

    let mut ancestor = normalized.as_path();
    while !ancestor.exists() {
        match ancestor.parent() {
            Some(parent) => ancestor = parent,
            None => break,
        }
    }
    let resolved = ancestor
        .canonicalize()
        .map_err(|e| Error::PermissionDenied(format!("cannot resolve '{path}': {e}")))?;
    if !resolved.starts_with(&root) {
        warn!(path = %path, resolved = %resolved.display(), "Symlink out of workspace rejected");
        return Err(outside(path));
    }

    debug!(original = %path, resolved = %normalized.display(), "Path resolved in workspace");
    Ok(normalized)
}

fn outside(path: &str) -> Error {
    Error::PermissionDenied(format!("'{path}' is outside the workspace"))
}

/// Check if a file holds credentials, judging by its name
#[must_use]
pub fn is_sensitive_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_lowercase();
    if name == ".env.example" {
        return false;
    }
    SENSITIVE_FILE_NAMES.contains(&name.as_str()) || name.starts_with(".env.")
}
