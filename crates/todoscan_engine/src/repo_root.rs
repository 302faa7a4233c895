use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

/// Directory whose presence marks a repository root. It is never scanned.
pub const REPO_MARKER_DIR: &str = ".git";

/// Returns the nearest ancestor of `start` (including `start` itself) that contains
/// the [`REPO_MARKER_DIR`] directory, or `None` when no ancestor up to the filesystem
/// root has one.
///
/// `start` is cleaned with [`clean_path`] first, so `a/../b` climbs from `b`.
#[instrument(level = "debug", fields(start = %start.display()))]
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let found = clean_path(start)
        .ancestors()
        .find(|dir| dir.join(REPO_MARKER_DIR).is_dir())
        .map(Path::to_path_buf);
    debug!(found = ?found, "repository root lookup finished");
    found
}

/// Like [`find_repo_root`], but falls back to `start` unchanged when no repository
/// root exists above it.
pub fn resolve_repo_root(start: &Path) -> PathBuf {
    find_repo_root(start).unwrap_or_else(|| start.to_path_buf())
}

/// Lexically remove `.` segments and resolve `..` against the preceding segment.
///
/// Symlinks are not consulted. `..` directly below the filesystem root stays at the
/// root, and leading `..` of a relative path are kept.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                Some(Component::ParentDir) | Some(Component::CurDir) | None => {
                    cleaned.push("..");
                }
            },
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
