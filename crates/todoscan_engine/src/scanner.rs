/* 📖 # How does a scan run?

One producer, many consumers:

1. The calling thread resolves the repository root, loads its exclusion rules and
   walks the tree depth-first, turning every file that survives the skip checks into
   a scan job.
2. Jobs go through a bounded channel. When it is full the walk blocks until a worker
   takes a job, so discovery can never run far ahead of scanning.
3. A fixed pool of workers opens each file through the PAL, runs the annotation
   matcher over it and appends the results to a single mutex-guarded collection.
4. Once the walk is done the sender is dropped; workers drain what is left and exit,
   and the scope joins them before anything is returned.

Failures are tolerated wherever possible. Unreadable entries below the root are
skipped, a file that cannot be opened or read contributes no records and is listed
in `file_errors`, and only a walk that cannot start at the root is reported as
`walk_error`.
*/

use std::collections::HashSet;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use todoscan_base::{
    ErrorKind, FilePath, OpenMode, Pal, PalHandle, RealPal, TodoscanError, TodoscanResult,
};

use crate::annotation::{AnnotationMatcher, AnnotationRecord};
use crate::ignore_rules::IgnoreSet;
use crate::repo_root::{REPO_MARKER_DIR, clean_path, find_repo_root};

/// Default capacity of the job queue between the walk and the workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Tuning knobs for a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Number of scan workers; values below 1 are treated as 1.
    pub workers: usize,
    /// Capacity of the bounded job queue; values below 1 are treated as 1.
    pub queue_capacity: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ScanOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }
}

/// Host parallelism, but never fewer than two workers.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(2)
}

/// A file that was queued but could not be scanned.
#[derive(Debug)]
pub struct FileScanError {
    /// Path relative to the scan root.
    pub file: FilePath,
    pub error: Box<TodoscanError>,
}

/// Everything a scan produced.
///
/// `records` have no particular order across files; within one file they are in
/// line order. Use [`crate::sort_records`] for a stable order.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub records: Vec<AnnotationRecord>,
    pub file_errors: Vec<FileScanError>,
    /// Set when the walk could not proceed from the root. Records found before the
    /// failure are still present.
    pub walk_error: Option<Box<TodoscanError>>,
    /// Number of files handed to workers.
    pub files_scanned: usize,
}

impl ScanOutcome {
    /// The records, or the walk error if there was one.
    pub fn into_result(self) -> TodoscanResult<Vec<AnnotationRecord>> {
        match self.walk_error {
            Some(error) => Err(error),
            None => Ok(self.records),
        }
    }
}

struct ScanJob {
    display: FilePath,
    open: PathBuf,
}

#[derive(Default)]
struct Collected {
    records: Vec<AnnotationRecord>,
    file_errors: Vec<FileScanError>,
}

/// Scan `root` on the real filesystem with default options.
///
/// Directories whose name is listed in `ignore_names` are skipped wherever they occur.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use todoscan_engine::{scan, sort_records};
///
/// let outcome = scan(Path::new("."), &["node_modules".to_string()]);
/// let mut records = outcome.into_result().unwrap();
/// sort_records(&mut records);
/// for r in &records {
///     println!("{}:{} {} {}", r.file, r.line, r.tag, r.text);
/// }
/// ```
pub fn scan(root: &Path, ignore_names: &[String]) -> ScanOutcome {
    let pal = PalHandle::new(RealPal::new(root.to_path_buf()));
    scan_with_pal(&pal, root, ignore_names, &ScanOptions::default())
}

/// Scan `root`, opening files through `pal`.
///
/// The tree itself is always walked on the real filesystem; `pal` only decides how the
/// contents of each discovered file are read.
#[instrument(
    skip(pal, ignore_names, options),
    fields(root = %root.display(), workers = options.workers, queue_capacity = options.queue_capacity)
)]
pub fn scan_with_pal(
    pal: &PalHandle,
    root: &Path,
    ignore_names: &[String],
    options: &ScanOptions,
) -> ScanOutcome {
    let skip_names: HashSet<&str> = ignore_names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    let root = clean_path(&std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()));
    let ignore_set = match find_repo_root(&root) {
        Some(repo_root) => IgnoreSet::load(&repo_root),
        None => {
            debug!("not inside a repository, no exclusion rules apply");
            IgnoreSet::empty(&root)
        }
    };

    let workers = options.workers.max(1);
    debug!(rules = ignore_set.len(), skip_names = skip_names.len(), workers, "scan starting");
    let (job_tx, job_rx) = crossbeam_channel::bounded::<ScanJob>(options.queue_capacity.max(1));
    let collected = Mutex::new(Collected::default());
    let matcher = AnnotationMatcher::shared();

    let walk = thread::scope(|scope| {
        let mut spawned = 0;
        for worker_idx in 0..workers {
            let rx = job_rx.clone();
            let collected = &collected;
            let spawn_result = thread::Builder::new()
                .name(format!("todoscan-worker-{worker_idx}"))
                .spawn_scoped(scope, move || run_worker(pal, matcher, rx, collected));
            match spawn_result {
                Ok(_) => spawned += 1,
                Err(e) => warn!(worker_idx, error = %e, "failed to spawn scan worker"),
            }
        }
        // Workers hold the only receivers now; if all of them are gone, sends fail.
        drop(job_rx);

        if spawned == 0 {
            return Err(Box::new(TodoscanError::message(
                "no scan worker could be started",
            )));
        }

        let walk = walk_tree(&root, &ignore_set, &skip_names, pal.open_mode(), &job_tx);
        drop(job_tx);
        Ok(walk)
    });

    let Collected {
        records,
        file_errors,
    } = collected.into_inner();
    let (files_scanned, walk_error) = match walk {
        Ok((files_scanned, walk_error)) => (files_scanned, walk_error),
        Err(error) => (0, Some(error)),
    };

    info!(
        files_enqueued = files_scanned,
        records = records.len(),
        file_errors = file_errors.len(),
        walk_failed = walk_error.is_some(),
        "scan complete"
    );

    ScanOutcome {
        records,
        file_errors,
        walk_error,
        files_scanned,
    }
}

fn run_worker(
    pal: &PalHandle,
    matcher: &AnnotationMatcher,
    jobs: Receiver<ScanJob>,
    collected: &Mutex<Collected>,
) {
    for job in jobs.iter() {
        match scan_file(&**pal, matcher, &job) {
            Ok(records) => {
                if !records.is_empty() {
                    collected.lock().records.extend(records);
                }
            }
            Err(error) => {
                warn!(file = %job.display, error = %error, "skipping unreadable file");
                collected.lock().file_errors.push(FileScanError {
                    file: job.display,
                    error,
                });
            }
        }
    }
}

fn scan_file(
    pal: &dyn Pal,
    matcher: &AnnotationMatcher,
    job: &ScanJob,
) -> TodoscanResult<Vec<AnnotationRecord>> {
    let reader = pal.open_file(&job.open)?;
    matcher
        .scan_reader(BufReader::new(reader), &job.display)
        .map_err(|e| Box::new(TodoscanError::file(&job.open, e)))
}

/// Walk `root` and enqueue scan jobs. Returns the number of jobs sent and the walk
/// error, if the root itself could not be walked.
fn walk_tree(
    root: &Path,
    ignore_set: &IgnoreSet,
    skip_names: &HashSet<&str>,
    open_mode: OpenMode,
    jobs: &Sender<ScanJob>,
) -> (usize, Option<Box<TodoscanError>>) {
    let mut sent = 0;
    let mut walker = WalkDir::new(root).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let error = TodoscanError::new(ErrorKind::Walk {
                    path: root.to_path_buf(),
                    message: e
                        .io_error()
                        .map(|io| io.to_string())
                        .unwrap_or_else(|| e.to_string()),
                });
                return (sent, Some(Box::new(error)));
            }
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if should_skip_dir(&entry, ignore_set, skip_names) {
                debug!(path = %entry.path().display(), "skipping directory");
                walker.skip_current_dir();
            }
            continue;
        }
        if !is_regular_file(&entry) {
            continue;
        }
        if ignore_set.is_excluded_path(entry.path(), false) {
            continue;
        }

        let display = display_path(root, &entry);
        let open = match open_mode {
            OpenMode::Absolute => entry.path().to_path_buf(),
            OpenMode::Relative => display.as_path().to_path_buf(),
        };
        if jobs.send(ScanJob { display, open }).is_err() {
            warn!("all scan workers exited early, stopping walk");
            break;
        }
        sent += 1;
    }
    (sent, None)
}

fn should_skip_dir(entry: &DirEntry, ignore_set: &IgnoreSet, skip_names: &HashSet<&str>) -> bool {
    let name = entry.file_name().to_string_lossy();
    name == REPO_MARKER_DIR
        || skip_names.contains(&*name)
        || ignore_set.is_excluded_path(entry.path(), true)
}

// Symlinks count when they point at a regular file; fifos and sockets are never opened.
fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

fn display_path(root: &Path, entry: &DirEntry) -> FilePath {
    match entry.path().strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => FilePath::from(rel),
        // The root itself is a file
        _ => FilePath::from(&*entry.file_name().to_string_lossy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoscan_base::MockPal;

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert!(options.workers >= 2);
        assert_eq!(options.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_into_result_prefers_walk_error() {
        let outcome = ScanOutcome {
            walk_error: Some(Box::new(TodoscanError::message("boom"))),
            ..Default::default()
        };
        assert_eq!(outcome.into_result().unwrap_err().to_string(), "boom");

        let outcome = ScanOutcome::default();
        assert!(outcome.into_result().unwrap().is_empty());
    }

    #[test]
    fn test_scan_file_tags_records_with_display_path() {
        let pal = MockPal::new();
        pal.add_file("main.go", "// TODO: refactor\n// NOTE: perf\n");
        let job = ScanJob {
            display: FilePath::from("cmd/main.go"),
            open: PathBuf::from("cmd/main.go"),
        };

        let records = scan_file(&pal, AnnotationMatcher::shared(), &job).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.file.as_str() == "cmd/main.go"));
    }

    #[test]
    fn test_scan_file_open_error() {
        let pal = MockPal::new();
        let job = ScanJob {
            display: FilePath::from("nope.go"),
            open: PathBuf::from("nope.go"),
        };
        assert!(scan_file(&pal, AnnotationMatcher::shared(), &job).is_err());
    }
}
