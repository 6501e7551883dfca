use crate::reports::Options;
use crate::{Host, Result};
use camino::Utf8Path;
use std::io::{self, Write};

/// Coverage state for one source file, populated from a notes buffer and then, optionally,
/// from a data buffer.
pub trait CoverageGraph: Default {
    /// Parse the notes format into the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is not a well-formed notes file.
    fn read_notes(&mut self, buffer: &[u8]) -> Result<()>;

    /// Augment the graph with execution counts.
    ///
    /// A failed read leaves the graph exactly as it was before the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is not a well-formed data file or doesn't match the notes.
    fn read_data(&mut self, buffer: &[u8]) -> Result<()>;

    /// Cheap sniff of whether a buffer starts like a data file.
    fn has_data_format_header(buffer: &[u8]) -> bool;

    /// Write a human-readable listing of the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn dump(&self, writer: &mut impl Write) -> io::Result<()>;
}

/// Turns a populated graph into the user-facing report.
pub trait ReportRenderer<G> {
    /// Render the report for one source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the report can't be written.
    fn render<H: Host>(
        &mut self,
        host: &mut H,
        options: &Options,
        source: &Utf8Path,
        notes_name: &str,
        data_name: &str,
        graph: &G,
    ) -> Result<()>;
}
