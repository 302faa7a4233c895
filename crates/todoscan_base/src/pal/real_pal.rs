use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::{TodoscanError, TodoscanResult};

use super::traits::{OpenMode, Pal};

/* 📖 # Why use std::fs instead of async or other crates?

Scanning is done by a fixed pool of OS threads; each worker blocks on its own file.
std::fs is sufficient for that, needs no runtime, and is easy to reason about.
*/

/// Concrete PAL implementation using the real filesystem via std::fs.
///
/// Relative paths are resolved against a configured base directory; absolute paths
/// (as produced by the directory walk) are used unchanged.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    /// Create a new RealPal with the given base directory.
    ///
    /// # Arguments
    /// * `base_dir` - Relative paths will be resolved against this directory
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolve a path against the base directory.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }
}

impl Pal for RealPal {
    #[instrument(level = "trace", skip(self), fields(path = %path.display()))]
    fn open_file(&self, path: &Path) -> TodoscanResult<Box<dyn Read + Send + 'static>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, resolved = %resolved.display(), "failed to open file");
            Box::new(TodoscanError::file(resolved, e))
        })?;
        Ok(Box::new(file))
    }

    fn open_mode(&self) -> OpenMode {
        OpenMode::Absolute
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn file_exists(&self, path: &Path) -> TodoscanResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.is_file();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn create_file(&self, path: &Path) -> TodoscanResult<Box<dyn Write + Send + 'static>> {
        let resolved = self.resolve_path(path);
        if let Some(parent) = resolved.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                debug!(error = %e, "failed to create parent directory");
                Box::new(TodoscanError::file(parent, e))
            })?;
        }
        debug!(resolved = %resolved.display(), "creating file");
        let file = fs::File::create(&resolved).map_err(|e| {
            debug!(error = %e, "failed to create file");
            Box::new(TodoscanError::file(resolved, e))
        })?;
        Ok(Box::new(file))
    }
}
