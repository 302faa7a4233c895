use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{TodoscanError, TodoscanResult};

use super::traits::{OpenMode, Pal};

/* 📖 # Why use HashMap for MockPal storage?

MockPal uses in-memory storage with Arc<Mutex<T>> for several reasons:
1. **Speed**: No filesystem I/O, deterministic and fast for unit tests
2. **Isolation**: No side effects on the real filesystem
3. **Control**: Failures can be injected for individual files
4. **Thread-safe**: scan workers open files concurrently
*/

/// In-memory PAL implementation for testing.
///
/// Files are looked up by exact identifier first and then by base name, so a test can
/// register `main.go` and have it served for `src/main.go`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use todoscan_base::{MockPal, Pal};
///
/// let mock = MockPal::new();
/// mock.add_file("test.txt", "content");
/// let content = mock.read_file_to_string(Path::new("dir/test.txt")).unwrap();
/// assert_eq!(content, "content");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockPal {
    /// Create a new empty MockPal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the mock storage.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        lock(&self.files).insert(path.into(), content.into());
    }

    /// Make every open of `path` fail with a permission error.
    pub fn fail_on_open(&self, path: impl Into<PathBuf>) {
        lock(&self.failing).insert(path.into());
    }

    /// Returns the contents of a file, e.g. one written through [`Pal::create_file`].
    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        lock(&self.files).get(path.as_ref()).cloned()
    }

    /// Identifiers passed to `open_file`, in call order.
    pub fn opened_paths(&self) -> Vec<PathBuf> {
        lock(&self.opened).clone()
    }

    fn lookup(&self, path: &Path) -> Option<Vec<u8>> {
        let files = lock(&self.files);
        if let Some(content) = files.get(path) {
            return Some(content.clone());
        }
        let name = path.file_name()?;
        files.get(Path::new(name)).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Pal for MockPal {
    fn open_file(&self, path: &Path) -> TodoscanResult<Box<dyn Read + Send + 'static>> {
        lock(&self.opened).push(path.to_path_buf());
        if lock(&self.failing).contains(path) {
            return Err(Box::new(TodoscanError::file(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected failure"),
            )));
        }
        let content = self.lookup(path).ok_or_else(|| {
            Box::new(TodoscanError::file(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                ),
            ))
        })?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn open_mode(&self) -> OpenMode {
        OpenMode::Relative
    }

    fn file_exists(&self, path: &Path) -> TodoscanResult<bool> {
        Ok(lock(&self.files).contains_key(path))
    }

    fn create_file(&self, path: &Path) -> TodoscanResult<Box<dyn Write + Send + 'static>> {
        // The buffer is stored in the mock storage when the writer is dropped
        Ok(Box::new(MockFileWriter {
            path: path.to_path_buf(),
            files: Arc::clone(&self.files),
            buffer: Vec::new(),
        }))
    }
}

/// Helper struct for writing files to MockPal.
struct MockFileWriter {
    path: PathBuf,
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    buffer: Vec<u8>,
}

impl Write for MockFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MockFileWriter {
    fn drop(&mut self) {
        lock(&self.files).insert(self.path.clone(), std::mem::take(&mut self.buffer));
    }
}
