// Shared kernel: error types and utilities used by every module.

pub mod errors; // Shared error types
pub mod utils; // Shared utilities (logging, retry, rate limiting)

// Re-exports for convenience
pub use errors::{AppError, AppResult};
