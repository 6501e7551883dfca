//! Command-line interface and the per-source driver loop
//!
//! This module parses the gcov-compatible command line and feeds every listed source
//! file through the coverage pipeline.
//!
//! # Implementation Model
//!
//! The `run` function parses arguments using clap into a single set of report arguments.
//! Those are split into the renderer's [`Options`](crate::reports::Options) and the
//! pipeline's [`Settings`](crate::pipeline::Settings), after which each source is processed
//! independently and in order. A failure for one source is reported and never affects the
//! next one, so a run that got past argument parsing always succeeds.
//!
//! All interaction with the outside world goes through the [`Host`] trait, which lets
//! tests capture output and supply standard input.

mod common;
mod host;
mod report;
mod run;

pub use host::Host;
#[cfg(test)]
pub use host::TestHost;
pub use report::{ReportArgs, process_sources};
pub use run::run;
