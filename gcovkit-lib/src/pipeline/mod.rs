//! Companion-file resolution and validation for one source file at a time
//!
//! For every source file, the pipeline derives the names of two companion artifacts,
//! a notes file written by the compiler and a data file written when the instrumented
//! program runs, loads them, validates them against a [`CoverageGraph`], and hands the
//! populated graph to a [`ReportRenderer`].
//!
//! # Implementation Model
//!
//! - [`paths`]: Stem derivation from the source path and the `-o` override, modeled as
//!   the tagged [`ObjectLocation`](paths::ObjectLocation) decision, plus artifact naming.
//! - [`loader`]: Reads an artifact (or standard input for `-`) into an immutable buffer,
//!   separating "not found" from every other I/O error.
//! - `process`: The state machine sequencing both of the above with the collaborators.
//!
//! The notes file is structurally required: any failure to load or parse it abandons the
//! source. The data file is optional enrichment: if it is missing the report shows zero
//! execution, and if it is malformed the report is still produced from the notes alone.

mod collaborator;
pub mod loader;
pub mod paths;
mod process;

pub use collaborator::{CoverageGraph, ReportRenderer};
pub use loader::LoadError;
pub use process::{PipelineOutcome, Settings, Stage, report_coverage};
