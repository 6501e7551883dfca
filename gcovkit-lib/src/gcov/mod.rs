//! Reader for the gcov notes (`.gcno`) and data (`.gcda`) formats
//!
//! A notes file describes every function's control-flow graph: its blocks, the arcs between
//! them, and the source lines each block covers. A data file supplies the execution counters
//! for the arcs that were instrumented. [`GcovFile`] combines the two and derives the remaining
//! block and arc counts by flow conservation.
//!
//! Both formats are sequences of 32-bit words in either byte order, identified by a four-byte
//! magic, followed by a version stamp and tagged, length-prefixed records.

mod buffer;
mod file;
mod function;
mod version;

#[cfg(any(debug_assertions, test))]
mod writer;

pub use file::GcovFile;
pub use function::{GcovFunction, SourceLine};

#[cfg(any(debug_assertions, test))]
pub use writer::GcovWriter;
