use super::Options;
use super::coverage::{FileCoverage, collect};
use super::intermediate;
use super::naming::{function_name, output_name};
use super::summary::{Summary, branch_percent};
use crate::gcov::{GcovFile, GcovFunction};
use crate::pipeline::{LoadError, ReportRenderer};
use crate::{Host, Result};
use camino::{Utf8Path, Utf8PathBuf};
use core::fmt::{self, Write as _};
use ohno::IntoAppError;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write as _;

const LOG_TARGET: &str = "    report";

/// Shown in place of source text past the end of the source file.
const EOF_TEXT: &str = "/*EOF*/";

/// Values repeated at the top of every `.gcov` file produced for one source.
#[derive(Debug, Clone, Copy)]
struct Header<'a> {
    notes_name: &'a str,
    data_name: &'a str,
    runs: u32,
    programs: u32,
}

/// Per-line numbering of branch, call and unconditional lines.
#[derive(Debug, Default)]
struct Numbering {
    branches: usize,
    calls: usize,
    unconditionals: usize,
}

/// Renders gcov-style summaries and `.gcov` files.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    output_dir: Utf8PathBuf,
}

impl TextRenderer {
    /// Create a renderer writing `.gcov` files into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write_file(&self, name: &str, text: &str) -> Result<()> {
        let path = self.output_dir.join(name);
        log::debug!(target: LOG_TARGET, "Writing '{path}'");
        fs::write(&path, text).into_app_err_with(|| format!("unable to write '{path}'"))
    }

    fn render_text<H: Host>(
        &self,
        host: &mut H,
        options: &Options,
        source: &Utf8Path,
        header: Header<'_>,
        graph: &GcovFile,
        files: &[FileCoverage],
    ) -> Result<()> {
        for file in files {
            let name = output_name(options, source, &file.path);

            if !options.no_output {
                let lines = read_source(host, &file.path);
                let mut text = String::new();
                write_gcov(&mut text, graph, file, &lines, header, options).into_app_err("unable to format coverage report")?;

                if options.use_stdout {
                    host.output()
                        .write_all(text.as_bytes())
                        .into_app_err("unable to write coverage report")?;
                } else {
                    self.write_file(&name, &text)?;
                }
            }

            if !options.use_stdout {
                let creating = (!options.no_output).then_some(name.as_str());
                write_summary(host, graph, file, options, creating)?;
            }
        }

        Ok(())
    }

    fn render_intermediate<H: Host>(
        &self,
        host: &mut H,
        options: &Options,
        source: &Utf8Path,
        graph: &GcovFile,
        files: &[FileCoverage],
    ) -> Result<()> {
        let mut text = String::new();
        for file in files {
            intermediate::write_file(&mut text, graph, file, options).into_app_err("unable to format coverage report")?;
            if !options.use_stdout {
                write_summary(host, graph, file, options, None)?;
            }
        }

        if options.no_output {
            return Ok(());
        }

        if options.use_stdout {
            return host
                .output()
                .write_all(text.as_bytes())
                .into_app_err("unable to write coverage report");
        }

        let name = output_name(options, source, source.as_str());
        self.write_file(&name, &text)?;
        let _ = writeln!(host.output(), "Creating '{name}'\n");
        Ok(())
    }
}

impl ReportRenderer<GcovFile> for TextRenderer {
    fn render<H: Host>(
        &mut self,
        host: &mut H,
        options: &Options,
        source: &Utf8Path,
        notes_name: &str,
        data_name: &str,
        graph: &GcovFile,
    ) -> Result<()> {
        let files = collect(graph, options);
        log::debug!(target: LOG_TARGET, "Rendering {} file(s) covered by '{source}'", files.len());

        if options.intermediate_format {
            return self.render_intermediate(host, options, source, graph, &files);
        }

        let header = Header {
            notes_name,
            data_name,
            runs: graph.runs(),
            programs: graph.programs(),
        };
        self.render_text(host, options, source, header, graph, &files)
    }
}

/// Read a source file's lines; an unreadable file is reported and treated as empty.
fn read_source<H: Host>(host: &mut H, path: &str) -> Vec<String> {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect(),
        Err(e) => {
            let _ = writeln!(host.error(), "{path}: {}", LoadError::from(e).system_message());
            Vec::new()
        }
    }
}

fn write_summary<H: Host>(host: &mut H, graph: &GcovFile, file: &FileCoverage, options: &Options, creating: Option<&str>) -> Result<()> {
    let mut text = String::new();
    format_summary(&mut text, graph, file, options, creating).into_app_err("unable to format coverage summary")?;
    let _ = host.output().write_all(text.as_bytes());
    Ok(())
}

fn format_summary(out: &mut String, graph: &GcovFile, file: &FileCoverage, options: &Options, creating: Option<&str>) -> fmt::Result {
    if options.function_summaries {
        for &f in &file.functions {
            let function = &graph.functions()[f];
            writeln!(out, "Function '{}'", function_name(options, &function.name))?;
            Summary::for_function(function).write(out, options)?;
            writeln!(out)?;
        }
    }

    writeln!(out, "File '{}'", file.display)?;
    Summary::for_file(graph, file).write(out, options)?;
    if let Some(name) = creating {
        writeln!(out, "Creating '{name}'")?;
    }
    writeln!(out)
}

fn write_gcov(
    out: &mut String,
    graph: &GcovFile,
    file: &FileCoverage,
    source: &[String],
    header: Header<'_>,
    options: &Options,
) -> fmt::Result {
    writeln!(out, "{:>9}:{:>5}:Source:{}", "-", 0, file.display)?;
    writeln!(out, "{:>9}:{:>5}:Graph:{}", "-", 0, header.notes_name)?;
    writeln!(out, "{:>9}:{:>5}:Data:{}", "-", 0, header.data_name)?;
    writeln!(out, "{:>9}:{:>5}:Runs:{}", "-", 0, header.runs)?;
    writeln!(out, "{:>9}:{:>5}:Programs:{}", "-", 0, header.programs)?;

    let mut functions = file.functions.iter().map(|&f| &graph.functions()[f]).peekable();

    for line in listed_lines(graph, file, source.len()) {
        while let Some(function) = functions.next_if(|function| function.start_line <= line) {
            if options.branch_probabilities {
                write_function_line(out, function, options)?;
            }
        }

        let text = source.get(line as usize - 1).map_or(EOF_TEXT, String::as_str);
        let count = match file.lines.get(&line) {
            None => "-".to_string(),
            Some(coverage) if coverage.count == 0 => "#####".to_string(),
            Some(coverage) => coverage.count.to_string(),
        };
        writeln!(out, "{count:>9}:{line:>5}:{text}")?;

        let mut numbering = Numbering::default();
        for (function, block) in file.attributed_blocks(graph, line) {
            if options.all_blocks {
                let count = function.blocks[block].count;
                let count = if count == 0 { "$$$$$".to_string() } else { count.to_string() };
                writeln!(out, "{count:>9}:{line:>5}-block {block:>2}")?;
            }

            if options.branch_probabilities {
                write_branch_lines(out, function, block, options, &mut numbering)?;
            }
        }
    }

    Ok(())
}

/// Line numbers to print: every line of the source, then only the lines past its end that
/// carry coverage or start a function.
fn listed_lines(graph: &GcovFile, file: &FileCoverage, source_len: usize) -> impl Iterator<Item = u32> {
    let source_end = u32::try_from(source_len).unwrap_or(u32::MAX);
    let mut past_end: BTreeSet<u32> = file.lines.range(source_end.saturating_add(1)..).map(|(&line, _)| line).collect();
    past_end.extend(
        file.functions
            .iter()
            .map(|&f| graph.functions()[f].start_line)
            .filter(|&line| line > source_end),
    );

    (1..=source_end).chain(past_end)
}

fn write_function_line(out: &mut String, function: &GcovFunction, options: &Options) -> fmt::Result {
    let entered = function.entry_count();
    let (blocks, executed) = function
        .body_blocks()
        .fold((0, 0), |(blocks, executed), (_, block)| (blocks + 1, executed + u64::from(block.count > 0)));

    writeln!(
        out,
        "function {} called {entered} returned {}% blocks executed {}%",
        function_name(options, &function.name),
        branch_percent(function.return_count(), entered),
        branch_percent(executed, blocks)
    )
}

fn write_branch_lines(out: &mut String, function: &GcovFunction, block: usize, options: &Options, numbering: &mut Numbering) -> fmt::Result {
    let count = function.blocks[block].count;
    let arcs: Vec<_> = function.real_out_arcs(block).collect();

    if function.is_call_site(block) {
        let n = numbering.calls;
        numbering.calls += 1;

        let returned = arcs.iter().map(|arc| arc.count).fold(0, u64::saturating_add);
        if count == 0 {
            writeln!(out, "call {n:>2} never executed")?;
        } else if options.branch_counts {
            writeln!(out, "call {n:>2} returned {returned}")?;
        } else {
            writeln!(out, "call {n:>2} returned {}%", branch_percent(returned, count))?;
        }
    }

    match arcs.as_slice() {
        [] => {}
        [arc] => {
            if options.unconditional_branches {
                let n = numbering.unconditionals;
                numbering.unconditionals += 1;

                if count == 0 {
                    writeln!(out, "unconditional {n:>2} never executed")?;
                } else {
                    writeln!(out, "unconditional {n:>2} taken {}", arc.count)?;
                }
            }
        }
        arcs => {
            let total = arcs.iter().map(|arc| arc.count).fold(0, u64::saturating_add);
            for arc in arcs {
                let n = numbering.branches;
                numbering.branches += 1;

                if count == 0 {
                    writeln!(out, "branch {n:>2} never executed")?;
                } else {
                    let fallthrough = if arc.is_fallthrough() { " (fallthrough)" } else { "" };
                    if options.branch_counts {
                        writeln!(out, "branch {n:>2} taken {}{fallthrough}", arc.count)?;
                    } else {
                        writeln!(out, "branch {n:>2} taken {}%{fallthrough}", branch_percent(arc.count, total))?;
                    }
                }
            }
        }
    }

    Ok(())
}
