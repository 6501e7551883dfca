use super::loader::{STDIN_TOKEN, load_artifact};
use super::paths::{DATA_SUFFIX, NOTES_SUFFIX, ObjectLocation, derive_artifact_name, derive_stem};
use super::{CoverageGraph, ReportRenderer};
use crate::Host;
use crate::reports::Options;
use camino::Utf8Path;
use std::io::Write;

const LOG_TARGET: &str = "  pipeline";

/// Per-invocation settings that steer artifact resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Object directory or object file override; empty to look next to each source.
    pub object_location: String,

    /// Explicit notes file, replacing the inferred name.
    pub notes_override: Option<String>,

    /// Explicit data file, replacing the inferred name.
    pub data_override: Option<String>,

    /// Dump each parsed graph to the diagnostic stream before rendering.
    pub dump: bool,
}

/// Steps of the per-source pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingPaths,
    LoadingNotes,
    ValidatingNotes,
    LoadingData,
    ValidatingData,
    Reporting,
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// A report was produced.
    Done,

    /// The source was abandoned at the given stage; a diagnostic has been written.
    Failed(Stage),
}

/// Resolve, load, and validate the artifacts of one source file, then render its report.
///
/// A missing data file or a malformed one degrades the report but doesn't prevent it,
/// while any notes failure or a data I/O failure abandons the source. Every problem is
/// written to the host's error stream; none is returned to the caller.
pub fn report_coverage<H, G, R>(host: &mut H, source: &Utf8Path, settings: &Settings, options: &Options, renderer: &mut R) -> PipelineOutcome
where
    H: Host,
    G: CoverageGraph,
    R: ReportRenderer<G>,
{
    let mut graph = G::default();

    log::debug!(target: LOG_TARGET, "{:?} for '{source}'", Stage::ResolvingPaths);
    let stem = derive_stem(source, ObjectLocation::classify(&settings.object_location));
    let notes_name = derive_artifact_name(&stem, settings.notes_override.as_deref(), NOTES_SUFFIX);
    let mut data_name = derive_artifact_name(&stem, settings.data_override.as_deref(), DATA_SUFFIX);

    log::debug!(target: LOG_TARGET, "{:?} '{notes_name}'", Stage::LoadingNotes);
    let notes = match load_artifact(host, &notes_name) {
        Ok(notes) => notes,
        Err(e) => {
            let _ = writeln!(host.error(), "{notes_name}: {e}");
            return PipelineOutcome::Failed(Stage::LoadingNotes);
        }
    };

    if let Err(e) = graph.read_notes(&notes) {
        log::debug!(target: LOG_TARGET, "Rejected notes file '{notes_name}': {e:#}");
        let _ = writeln!(host.error(), "Invalid .gcno File!");
        return PipelineOutcome::Failed(Stage::ValidatingNotes);
    }
    drop(notes);

    log::debug!(target: LOG_TARGET, "{:?} '{data_name}'", Stage::LoadingData);
    match load_artifact(host, &data_name) {
        Ok(data) => validate_data(host, &mut graph, &data_name, &data),
        Err(e) if e.is_not_found() => {
            log::info!(target: LOG_TARGET, "No data file '{data_name}', reporting zero execution");
            data_name = STDIN_TOKEN.to_string();
        }
        Err(e) => {
            let _ = writeln!(host.error(), "{data_name}: {e}");
            return PipelineOutcome::Failed(Stage::LoadingData);
        }
    }

    if settings.dump {
        let _ = graph.dump(&mut host.error());
    }

    log::debug!(target: LOG_TARGET, "{:?} '{source}'", Stage::Reporting);
    match renderer.render(host, options, source, &notes_name, &data_name, &graph) {
        Ok(()) => PipelineOutcome::Done,
        Err(e) => {
            let _ = writeln!(host.error(), "{source}: {e}");
            PipelineOutcome::Failed(Stage::Reporting)
        }
    }
}

/// Apply a loaded data buffer to the graph; failures are reported but never fatal.
fn validate_data<H: Host, G: CoverageGraph>(host: &mut H, graph: &mut G, data_name: &str, data: &[u8]) {
    log::debug!(target: LOG_TARGET, "{:?} '{data_name}'", Stage::ValidatingData);

    if !G::has_data_format_header(data) {
        let _ = writeln!(host.error(), "{data_name}:not a gcov data file");
        return;
    }

    if let Err(e) = graph.read_data(data) {
        log::debug!(target: LOG_TARGET, "Rejected data file '{data_name}': {e:#}");
        let _ = writeln!(host.error(), "Invalid .gcda File!");
    }
}
