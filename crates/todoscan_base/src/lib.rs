/* 📖 # Why have todoscan_base as a core library?
todoscan_base provides the error type, tracing bootstrap and the platform abstraction
layer shared by the engine and the command line front end.
Keeping them apart from the engine prevents circular dependencies between crates.
*/

pub mod error;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, ResultExt, TodoscanError, TodoscanResult};
pub use pal::{FilePath, MockPal, OpenMode, Pal, PalHandle, RealPal};
