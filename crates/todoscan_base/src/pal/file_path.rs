use relative_path::RelativePathBuf;
use serde::Serialize;
use std::path::{Component, Path};

/* 📖 # Why use RelativePathBuf for FilePath?

Annotation records report where they were found relative to the scan root, always with
forward slashes, no matter which platform produced them. RelativePathBuf gives us that
normalized form and keeps absolute system paths out of the records.
*/

/// Type-safe wrapper for a forward-slash path relative to a base directory.
///
/// # Examples
///
/// ```
/// use todoscan_base::FilePath;
///
/// let path = FilePath::from("src/main.rs");
/// assert_eq!(path.file_name(), Some("main.rs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the path as a forward-slash string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the final path segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// Converts to a regular Path for use with std::fs operations.
    /// This returns the relative path portion without a base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

/// Joins the normal components of a native path with `/`; `.` segments are dropped.
impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        let mut buf = RelativePathBuf::new();
        for component in p.components() {
            match component {
                Component::Normal(segment) => buf.push(&*segment.to_string_lossy()),
                Component::ParentDir => buf.push(".."),
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        Self(buf)
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
