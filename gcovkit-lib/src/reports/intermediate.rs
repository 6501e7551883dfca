//! The line-oriented intermediate format (`-i`), meant for other tools to parse.

use super::Options;
use super::coverage::FileCoverage;
use super::naming::function_name;
use crate::gcov::GcovFile;
use core::fmt::{self, Write};

pub fn write_file(out: &mut impl Write, graph: &GcovFile, file: &FileCoverage, options: &Options) -> fmt::Result {
    writeln!(out, "file:{}", file.display)?;

    for &f in &file.functions {
        let function = &graph.functions()[f];
        writeln!(
            out,
            "function:{},{},{}",
            function.start_line,
            function.entry_count(),
            function_name(options, &function.name)
        )?;
    }

    for (&line, coverage) in &file.lines {
        writeln!(out, "lcount:{line},{}", coverage.count)?;

        for (function, block) in file.attributed_blocks(graph, line) {
            let arcs: Vec<_> = function.real_out_arcs(block).collect();
            if arcs.len() < 2 {
                continue;
            }

            let ran = function.blocks[block].count > 0;
            for arc in arcs {
                let state = match (ran, arc.count) {
                    (false, _) => "notexec",
                    (true, 0) => "nottaken",
                    (true, _) => "taken",
                };
                writeln!(out, "branch:{line},{state}")?;
            }
        }
    }

    Ok(())
}
