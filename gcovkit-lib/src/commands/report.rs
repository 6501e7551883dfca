use super::Host;
use super::common::{LogLevel, init_logging};
use crate::Result;
use crate::gcov::GcovFile;
use crate::pipeline::{PipelineOutcome, Settings, report_coverage};
use crate::reports::{Options, TextRenderer};
use camino::Utf8PathBuf;
use clap::Parser;

const LOG_TARGET: &str = "   command";

const DEBUG_HEADING: &str = "Internal and debugging options";

#[derive(Parser, Debug)]
#[expect(clippy::struct_excessive_bools, reason = "One flag per gcov switch")]
pub struct ReportArgs {
    /// Source files to report on
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<Utf8PathBuf>,

    /// Display all basic blocks
    #[arg(short = 'a', long)]
    pub all_blocks: bool,

    /// Display branch probabilities
    #[arg(short = 'b', long)]
    pub branch_probabilities: bool,

    /// Display branch counts instead of percentages (requires -b)
    #[arg(short = 'c', long)]
    pub branch_counts: bool,

    /// Show a coverage summary for each function
    #[arg(short = 'f', long)]
    pub function_summaries: bool,

    /// Write the intermediate text format
    #[arg(short = 'i', long)]
    pub intermediate_format: bool,

    /// Prefix output file names with the main source file name
    #[arg(short = 'l', long)]
    pub long_file_names: bool,

    /// Demangle function names
    #[arg(short = 'm', long)]
    pub demangled_names: bool,

    /// Do not write any .gcov files
    #[arg(short = 'n', long)]
    pub no_output: bool,

    /// Find objects in DIR, or in FILE stripped of its extension
    #[arg(short = 'o', long = "object-directory", visible_alias = "object-file", value_name = "DIR|FILE")]
    pub object_directory: Option<String>,

    /// Preserve path components in output file names
    #[arg(short = 'p', long)]
    pub preserve_paths: bool,

    /// Only report sources with relative paths
    #[arg(short = 'r', long)]
    pub relative_only: bool,

    /// Prefix to elide from source file names
    #[arg(short = 's', long, value_name = "DIR")]
    pub source_prefix: Option<String>,

    /// Write reports to standard output instead of .gcov files
    #[arg(short = 't', long = "stdout")]
    pub use_stdout: bool,

    /// Display unconditional branch counts too (requires -b)
    #[arg(short = 'u', long)]
    pub unconditional_branches: bool,

    /// Hash long output file names
    #[arg(short = 'x', long)]
    pub hash_filenames: bool,

    /// Dump the coverage graph to standard error
    #[arg(long, help_heading = DEBUG_HEADING)]
    pub dump: bool,

    /// Override the notes file name; `-` reads standard input
    #[arg(long, value_name = "FILE", help_heading = DEBUG_HEADING)]
    pub gcno: Option<String>,

    /// Override the data file name; `-` reads standard input
    #[arg(long, value_name = "FILE", help_heading = DEBUG_HEADING)]
    pub gcda: Option<String>,

    /// Log level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", env = "GCOVKIT_LOG_LEVEL")]
    pub log_level: LogLevel,
}

impl ReportArgs {
    /// The switches handed to the renderer.
    #[must_use]
    pub fn options(&self) -> Options {
        Options {
            all_blocks: self.all_blocks,
            branch_probabilities: self.branch_probabilities,
            branch_counts: self.branch_counts,
            function_summaries: self.function_summaries,
            intermediate_format: self.intermediate_format,
            long_file_names: self.long_file_names,
            demangled_names: self.demangled_names,
            no_output: self.no_output,
            preserve_paths: self.preserve_paths,
            relative_only: self.relative_only,
            use_stdout: self.use_stdout,
            unconditional_branches: self.unconditional_branches,
            hash_filenames: self.hash_filenames,
            source_prefix: self.source_prefix.clone().unwrap_or_default(),
        }
    }

    /// Where the pipeline looks for companion files.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            object_location: self.object_directory.clone().unwrap_or_default(),
            notes_override: self.gcno.clone(),
            data_override: self.gcda.clone(),
            dump: self.dump,
        }
    }
}

/// Report coverage for every source, in command-line order.
///
/// A source that can't be reported on is diagnosed and skipped; it never stops the others.
pub fn process_sources<H: Host>(host: &mut H, args: &ReportArgs) -> Result<()> {
    init_logging(args.log_level);

    let options = args.options();
    let settings = args.settings();
    let mut renderer = TextRenderer::new(".");

    for source in &args.sources {
        match report_coverage::<_, GcovFile, _>(host, source, &settings, &options, &mut renderer) {
            PipelineOutcome::Done => log::debug!(target: LOG_TARGET, "Reported on '{source}'"),
            PipelineOutcome::Failed(stage) => log::info!(target: LOG_TARGET, "Gave up on '{source}' while {stage:?}"),
        }
    }

    Ok(())
}
