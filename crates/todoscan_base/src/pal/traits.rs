use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::TodoscanResult;

/// How a PAL wants scan jobs to identify the files they open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Identify files by the absolute path produced by the directory walk.
    Absolute,
    /// Identify files by their path relative to the scan root.
    Relative,
}

/* 📖 # Why is Pal a trait instead of a struct?

Workers open files through `dyn Pal`, so the scanner runs unchanged against the real
filesystem or an in-memory substitute. A handful of methods suffices; there is no
hierarchy of file types.
*/

/// Platform Abstraction Layer (PAL) trait providing file access.
///
/// Two implementations are provided:
/// - `RealPal`: Uses the real filesystem via `std::fs`
/// - `MockPal`: In-memory implementation for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Open a file for reading.
    ///
    /// Errors (not found, permission denied, ...) are returned to the caller, who decides
    /// whether they are fatal.
    fn open_file(&self, path: &Path) -> TodoscanResult<Box<dyn Read + Send + 'static>>;

    /// Which identifier the scanner should pass to [`Pal::open_file`] for walked files.
    fn open_mode(&self) -> OpenMode {
        OpenMode::Relative
    }

    /// Check if a file exists at the given path.
    fn file_exists(&self, path: &Path) -> TodoscanResult<bool>;

    /// Create a new file, overwriting if it exists.
    fn create_file(&self, path: &Path) -> TodoscanResult<Box<dyn Write + Send + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &Path) -> TodoscanResult<String> {
        let mut reader = self.open_file(path)?;
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| Box::new(crate::TodoscanError::file(path, e)))?;
        String::from_utf8(contents)
            .map_err(|_e| crate::err!("File is not valid UTF-8: {}", path.display()))
    }
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// Internally wraps `Arc<dyn Pal>` for cheap cloning and thread-safe sharing
/// between the walking thread and the scan workers.
///
/// # Examples
///
/// ```no_run
/// use todoscan_base::{RealPal, PalHandle};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone(); // Cheap clone, shares the same implementation
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    /// Create a new PalHandle from a Pal implementation.
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
