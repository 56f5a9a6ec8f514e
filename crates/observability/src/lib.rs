//! Process-wide tracing setup shared by ArchiGenie binaries.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{DEFAULT_FILTER, init};
