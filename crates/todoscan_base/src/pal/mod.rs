/* 📖 # What is the Platform Abstraction Layer?

The PAL is the storage capability the scanner opens files through.
Key benefits:
- Testability: MockPal serves file contents from memory, with injectable failures
- Flexibility: Switch between real filesystem and in-memory implementations
- Consistency: All file operations use the same error handling

Scan jobs only ever call `open_file`; configuration loading and report output use the
remaining operations.
*/

mod file_path;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{OpenMode, Pal, PalHandle};
