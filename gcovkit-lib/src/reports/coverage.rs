//! Line coverage grouped per source file.

use super::Options;
use crate::gcov::{GcovFile, GcovFunction, SourceLine};
use camino::Utf8Path;
use std::collections::BTreeMap;

/// Execution data for one source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCoverage {
    pub count: u64,

    /// (function, block) pairs of every block covering this line
    pub blocks: Vec<(usize, usize)>,
}

/// Everything the graph knows about one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCoverage {
    pub file: usize,

    /// Path as recorded in the notes file, used to read the source
    pub path: String,

    /// Path as shown in reports, after the source prefix is elided
    pub display: String,

    pub lines: BTreeMap<u32, LineCoverage>,

    /// Indices of the functions starting in this file, in start-line order
    pub functions: Vec<usize>,
}

impl FileCoverage {
    /// The blocks whose branches and block lines are attributed to `line`.
    ///
    /// A block is attributed to the last line it covers. Entry and exit blocks never are.
    pub fn attributed_blocks<'a>(&'a self, graph: &'a GcovFile, line: u32) -> impl Iterator<Item = (&'a GcovFunction, usize)> {
        let here = SourceLine { file: self.file, line };
        self.lines
            .get(&line)
            .into_iter()
            .flat_map(|coverage| coverage.blocks.iter().copied())
            .map(|(function, block)| (&graph.functions()[function], block))
            .filter(move |(function, block)| {
                let b = &function.blocks[*block];
                *block != 0 && !b.out_arcs.is_empty() && b.last_line() == Some(here)
            })
    }
}

/// Strip the `-s` prefix from a path, along with any separator left at the front.
#[must_use]
pub fn elide_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return path;
    }

    path.strip_prefix(prefix).map_or(path, |rest| rest.trim_start_matches('/'))
}

/// Group the graph's line data per source file, in order of first appearance.
///
/// Files without any lines are dropped, as are absolute paths when only relative ones are wanted.
#[must_use]
pub fn collect(graph: &GcovFile, options: &Options) -> Vec<FileCoverage> {
    let mut files: Vec<FileCoverage> = graph
        .files()
        .iter()
        .map(|(file, path)| FileCoverage {
            file,
            path: path.to_string(),
            display: elide_prefix(path, &options.source_prefix).to_string(),
            lines: BTreeMap::new(),
            functions: Vec::new(),
        })
        .collect();

    for (f, function) in graph.functions().iter().enumerate() {
        files[function.file].functions.push(f);

        for (b, block) in function.blocks.iter().enumerate() {
            for line in &block.lines {
                let blocks = &mut files[line.file].lines.entry(line.line).or_default().blocks;
                if !blocks.contains(&(f, b)) {
                    blocks.push((f, b));
                }
            }
        }
    }

    for file in &mut files {
        file.functions.sort_by_key(|&f| graph.functions()[f].start_line);
        for (&line, coverage) in &mut file.lines {
            coverage.count = line_count(graph, SourceLine { file: file.file, line }, &coverage.blocks);
        }
    }

    files
        .into_iter()
        .filter(|file| !file.lines.is_empty())
        .filter(|file| !(options.relative_only && Utf8Path::new(&file.display).is_absolute()))
        .collect()
}

/// How often a line ran: the flow entering its blocks from elsewhere.
///
/// Arcs between blocks on the same line are internal to it and not counted again. Entry blocks
/// contribute their own count. If that leaves nothing but some block ran, the busiest block wins.
fn line_count(graph: &GcovFile, line: SourceLine, blocks: &[(usize, usize)]) -> u64 {
    let mut entering = 0_u64;
    let mut busiest = 0;

    for &(f, b) in blocks {
        let function = &graph.functions()[f];
        let block = &function.blocks[b];
        busiest = busiest.max(block.count);

        if block.in_arcs.is_empty() {
            entering = entering.saturating_add(block.count);
            continue;
        }

        for &arc in &block.in_arcs {
            let arc = &function.arcs[arc];
            if !function.blocks[arc.source].is_on(line) {
                entering = entering.saturating_add(arc.count);
            }
        }
    }

    if entering == 0 { busiest } else { entering }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcov::GcovWriter;
    use crate::pipeline::CoverageGraph;

    /// `main` in /src/a.c loops over line 4 with its condition on line 3; `helper` in b.h never runs.
    fn graph() -> GcovFile {
        let mut notes = GcovWriter::notes(b"407*");
        let _ = notes
            .function(1, 1, 1, "main", "/src/a.c", 1)
            .blocks(6)
            .arcs(0, &[(1, 1)])
            .arcs(1, &[(2, 1)])
            .arcs(2, &[(3, 0), (4, 0)])
            .arcs(3, &[(2, 1)])
            .arcs(4, &[(5, 1)])
            .lines(1, "/src/a.c", &[2])
            .lines(2, "/src/a.c", &[3])
            .lines(3, "/src/a.c", &[4])
            .lines(4, "/src/a.c", &[5])
            .function(2, 2, 2, "helper", "b.h", 10)
            .blocks(3)
            .arcs(0, &[(1, 1)])
            .arcs(1, &[(2, 0)])
            .lines(1, "b.h", &[11]);

        let mut data = GcovWriter::data(b"407*");
        let _ = data
            .data_function(1, 1, 1)
            .arc_counters(&[4, 1])
            .data_function(2, 2, 2)
            .arc_counters(&[0]);

        let mut graph = GcovFile::default();
        graph.read_notes(&notes.finish()).unwrap();
        graph.read_data(&data.finish()).unwrap();
        graph
    }

    fn counts(file: &FileCoverage) -> Vec<(u32, u64)> {
        file.lines.iter().map(|(&line, c)| (line, c.count)).collect()
    }

    #[test]
    fn test_files_in_first_appearance_order() {
        let files = collect(&graph(), &Options::default());
        let names: Vec<_> = files.iter().map(|f| f.display.as_str()).collect();
        assert_eq!(names, vec!["/src/a.c", "b.h"]);
    }

    #[test]
    fn test_line_counts_exclude_internal_arcs() {
        let files = collect(&graph(), &Options::default());

        // the loop condition runs once on entry and once after every iteration
        assert_eq!(counts(&files[0]), vec![(2, 1), (3, 5), (4, 4), (5, 1)]);
        assert_eq!(counts(&files[1]), vec![(11, 0)]);
    }

    #[test]
    fn test_relative_only_drops_absolute_paths() {
        let options = Options {
            relative_only: true,
            ..Options::default()
        };
        let files = collect(&graph(), &options);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].display, "b.h");
    }

    #[test]
    fn test_source_prefix_keeps_file_under_relative_only() {
        let options = Options {
            relative_only: true,
            source_prefix: "/src".to_string(),
            ..Options::default()
        };
        let files = collect(&graph(), &options);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].display, "a.c");
        assert_eq!(files[0].path, "/src/a.c");
    }

    #[test]
    fn test_attributed_blocks_use_last_line() {
        let graph = graph();
        let files = collect(&graph, &Options::default());

        let on_2: Vec<_> = files[0].attributed_blocks(&graph, 2).map(|(_, b)| b).collect();
        let on_3: Vec<_> = files[0].attributed_blocks(&graph, 3).map(|(_, b)| b).collect();
        assert_eq!(on_2, vec![1]);
        assert_eq!(on_3, vec![2]);
    }

    #[test]
    fn test_elide_prefix() {
        assert_eq!(elide_prefix("/src/a.c", "/src"), "a.c");
        assert_eq!(elide_prefix("/src/a.c", "/src/"), "a.c");
        assert_eq!(elide_prefix("/other/a.c", "/src"), "/other/a.c");
        assert_eq!(elide_prefix("a.c", ""), "a.c");
    }
}
