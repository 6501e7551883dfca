//! gcov-compatible report generation
//!
//! This module turns a populated [`GcovFile`](crate::gcov::GcovFile) into the
//! summaries and `.gcov` files users know from gcov.
//!
//! # Implementation Model
//!
//! Rendering happens in two steps:
//! - **Grouping**: The graph's blocks are folded into per-file, per-line execution counts,
//!   keeping files in the order they first appear in the notes file.
//! - **Formatting**: Each file becomes a `Lines executed` summary on the host's output and,
//!   unless suppressed, an annotated copy of its source. The intermediate format replaces the
//!   annotated copies with one machine-readable listing per source.
//!
//! Output naming, percentages and demangling are shared helpers, so the plain and intermediate
//! formats agree on them.
//!
//! All switches arrive through the plain [`Options`] struct.

mod coverage;
mod intermediate;
mod naming;
mod options;
mod summary;
mod text;

pub use options::Options;
pub use text::TextRenderer;
