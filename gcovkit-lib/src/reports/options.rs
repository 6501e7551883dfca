/// Switches controlling the verbosity and layout of generated reports.
///
/// This is a plain data contract: it is built once from the command line and handed
/// unchanged to the renderer for every source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[expect(clippy::struct_excessive_bools, reason = "Mirrors the flat set of gcov command-line switches")]
pub struct Options {
    /// Emit a line for every basic block (`-a`)
    pub all_blocks: bool,

    /// Emit branch and call probabilities (`-b`)
    pub branch_probabilities: bool,

    /// Emit branch counts instead of percentages (`-c`)
    pub branch_counts: bool,

    /// Emit a summary for each function (`-f`)
    pub function_summaries: bool,

    /// Emit the intermediate text format (`-i`)
    pub intermediate_format: bool,

    /// Prefix output names with the name of the main source file (`-l`)
    pub long_file_names: bool,

    /// Demangle function names (`-m`)
    pub demangled_names: bool,

    /// Do not write any `.gcov` output (`-n`)
    pub no_output: bool,

    /// Keep path components in output names (`-p`)
    pub preserve_paths: bool,

    /// Only report files with relative paths or with the source prefix (`-r`)
    pub relative_only: bool,

    /// Write reports to the host output instead of to files (`-t`)
    pub use_stdout: bool,

    /// Emit unconditional branches as well (`-u`)
    pub unconditional_branches: bool,

    /// Hash long output names (`-x`)
    pub hash_filenames: bool,

    /// Prefix elided from source names; empty when unset (`-s`)
    pub source_prefix: String,
}
