use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic
- The span trace captured at construction shows which scan stage failed
 */

/// Error variants that can occur in todoscan operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The directory walk itself could not proceed (e.g. the scan root is missing)
    Walk { path: PathBuf, message: String },

    /// Configuration could not be parsed
    Config { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

/* 📖 # Why separate ErrorKind and TodoscanError?
ErrorKind holds the structural variants callers can match on.
TodoscanError wraps it with context strings attached during propagation and the
span trace recorded where the error was created.
*/

/// Error type wrapping an [`ErrorKind`] with context and a span trace.
pub struct TodoscanError {
    kind: ErrorKind,
    context: Vec<String>,
    span_trace: SpanTrace,
}

impl TodoscanError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a message error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a file error for the given path.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::new(ErrorKind::FileError {
            path: path.into(),
            source,
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context strings in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_kind(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Walk { path, message } => {
                write!(f, "Cannot walk {}: {}", path.display(), message)
            }
            ErrorKind::Config { message } => write!(f, "Invalid configuration: {}", message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

impl From<ErrorKind> for TodoscanError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for TodoscanError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for TodoscanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        self.fmt_kind(f)
    }
}

impl fmt::Debug for TodoscanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_kind(f)?;
        writeln!(f)?;
        let last = self.context.len().saturating_sub(1);
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            writeln!(f, "{} {}", branch, ctx)?;
        }
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<TodoscanError> in the result type?

Boxing the error reduces the size of the result type, making it more efficient to return in the common case.
*/

/// Standard result type for todoscan operations.
pub type TodoscanResult<T> = std::result::Result<T, Box<TodoscanError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> TodoscanResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> TodoscanResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for TodoscanResult<T> {
    fn context(self, context: impl Into<String>) -> TodoscanResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> TodoscanResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Create a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        ::std::boxed::Box::new($crate::error::TodoscanError::message(format!($($arg)*)))
    };
}
