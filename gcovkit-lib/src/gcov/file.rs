use super::buffer::{FileKind, GcovBuffer, sniff};
use super::function::GcovFunction;
use super::version::GcovVersion;
use crate::Result;
use crate::pipeline::CoverageGraph;
use ohno::{app_err, bail};
use std::collections::HashMap;
use std::io::{self, Write};

const LOG_TARGET: &str = "      gcov";

pub const TAG_FUNCTION: u32 = 0x0100_0000;
pub const TAG_BLOCKS: u32 = 0x0141_0000;
pub const TAG_ARCS: u32 = 0x0143_0000;
pub const TAG_LINES: u32 = 0x0145_0000;
pub const TAG_COUNTER_ARCS: u32 = 0x01a1_0000;
pub const TAG_OBJECT_SUMMARY: u32 = 0xa100_0000;
pub const TAG_PROGRAM_SUMMARY: u32 = 0xa300_0000;

/// Interned source file names referenced by a notes file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FileTable {
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index.get(name) {
            return index;
        }

        let index = self.names.len();
        self.names.push(name.to_string());
        let _ = self.index.insert(name.to_string(), index);
        index
    }

    #[must_use]
    pub fn name(&self, index: usize) -> &str {
        self.names.get(index).map_or("", String::as_str)
    }

    /// File names in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }
}

/// Coverage graph built from a gcov notes file and, optionally, its data file.
#[derive(Debug, Clone, Default)]
pub struct GcovFile {
    version: Option<GcovVersion>,
    stamp: u32,
    files: FileTable,
    functions: Vec<GcovFunction>,
    runs: u32,
    programs: u32,
}

impl GcovFile {
    #[must_use]
    pub const fn files(&self) -> &FileTable {
        &self.files
    }

    #[must_use]
    pub fn functions(&self) -> &[GcovFunction] {
        &self.functions
    }

    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    #[must_use]
    pub const fn programs(&self) -> u32 {
        self.programs
    }

    fn parse_notes(&mut self, buffer: &[u8]) -> Result<()> {
        if self.version.is_some() {
            bail!("notes already loaded");
        }

        let (mut buf, kind) = GcovBuffer::open(buffer)?;
        if kind != FileKind::Notes {
            bail!("expected a notes file but found a data file");
        }

        let version = GcovVersion::from_word(buf.read_word()?)?;
        let stamp = buf.read_word()?;
        let mut files = FileTable::default();
        let mut functions: Vec<GcovFunction> = Vec::new();

        while !buf.is_at_end() {
            let offset = buf.position();
            let tag = buf.read_word()?;
            if tag == 0 {
                break;
            }

            let words = buf.read_word()?;
            let mut record = buf.take_record(words)?;

            if tag == TAG_FUNCTION {
                functions.push(GcovFunction::read(&mut record, version, &mut files)?);
                continue;
            }

            let Some(function) = functions.last_mut() else {
                if matches!(tag, TAG_BLOCKS | TAG_ARCS | TAG_LINES) {
                    bail!("record 0x{tag:08x} at offset {offset} precedes any function");
                }
                continue;
            };

            match tag {
                TAG_BLOCKS => function.set_block_count(words)?,
                TAG_ARCS => function.read_arcs(&mut record, words)?,
                TAG_LINES => function.read_lines(&mut record, &mut files)?,
                _ => log::trace!(target: LOG_TARGET, "Skipping notes record 0x{tag:08x} at offset {offset}"),
            }
        }

        log::debug!(target: LOG_TARGET, "Read {} functions from gcov {version} notes", functions.len());

        self.version = Some(version);
        self.stamp = stamp;
        self.files = files;
        self.functions = functions;
        for function in &mut self.functions {
            function.solve();
        }
        Ok(())
    }

    fn parse_data(&mut self, buffer: &[u8]) -> Result<()> {
        let version = self.version.ok_or_else(|| app_err!("data file read before any notes file"))?;

        let (mut buf, kind) = GcovBuffer::open(buffer)?;
        if kind != FileKind::Data {
            bail!("expected a data file but found a notes file");
        }

        let data_version = GcovVersion::from_word(buf.read_word()?)?;
        if data_version != version {
            bail!("version mismatch: notes are gcov {version}, data is gcov {data_version}");
        }

        let stamp = buf.read_word()?;
        if stamp != self.stamp {
            bail!("stamp mismatch: notes have 0x{:08x}, data has 0x{stamp:08x}", self.stamp);
        }

        let by_ident: HashMap<u32, usize> = self.functions.iter().enumerate().map(|(i, f)| (f.ident, i)).collect();
        let mut staged: Vec<(usize, Vec<u64>)> = Vec::new();
        let mut current = None;
        let mut runs = 0;
        let mut programs = 0;

        while !buf.is_at_end() {
            let offset = buf.position();
            let tag = buf.read_word()?;
            if tag == 0 {
                break;
            }

            let words = buf.read_word()?;
            let mut record = buf.take_record(words)?;

            match tag {
                TAG_FUNCTION if words == 0 => current = None,
                TAG_FUNCTION => {
                    let ident = record.read_word()?;
                    let index = *by_ident
                        .get(&ident)
                        .ok_or_else(|| app_err!("data file references unknown function {ident}"))?;
                    let function = &self.functions[index];

                    if record.read_word()? != function.line_checksum {
                        bail!("line checksum mismatch for function '{}'", function.name);
                    }
                    if version.has_cfg_checksum() && words >= 3 && record.read_word()? != function.cfg_checksum {
                        bail!("cfg checksum mismatch for function '{}'", function.name);
                    }

                    current = Some(index);
                }
                TAG_COUNTER_ARCS => {
                    let index = current.ok_or_else(|| app_err!("arc counters at offset {offset} precede any function"))?;
                    let counters = (0..words / 2).map(|_| record.read_counter()).collect::<Result<Vec<_>>>()?;
                    let expected = self.functions[index].instrumented_arc_count();
                    if counters.len() != expected {
                        bail!(
                            "function '{}' expects {expected} arc counters but the data file has {}",
                            self.functions[index].name,
                            counters.len()
                        );
                    }
                    staged.push((index, counters));
                }
                TAG_OBJECT_SUMMARY if words >= 3 => {
                    let _checksum = record.read_word()?;
                    let _counter_count = record.read_word()?;
                    runs = record.read_word()?;
                }
                TAG_PROGRAM_SUMMARY => programs += 1,
                _ => log::trace!(target: LOG_TARGET, "Skipping data record 0x{tag:08x} at offset {offset}"),
            }
        }

        // Nothing has been touched so far; apply everything at once.
        for (index, counters) in staged {
            self.functions[index].add_counters(&counters)?;
        }
        for function in &mut self.functions {
            function.solve();
        }
        self.runs = self.runs.saturating_add(runs);
        self.programs = self.programs.saturating_add(programs);

        Ok(())
    }
}

impl CoverageGraph for GcovFile {
    fn read_notes(&mut self, buffer: &[u8]) -> Result<()> {
        self.parse_notes(buffer)
    }

    fn read_data(&mut self, buffer: &[u8]) -> Result<()> {
        self.parse_data(buffer)
    }

    fn has_data_format_header(buffer: &[u8]) -> bool {
        matches!(sniff(buffer), Some((FileKind::Data, _)))
    }

    fn dump(&self, writer: &mut impl Write) -> io::Result<()> {
        if let Some(version) = self.version {
            writeln!(writer, "gcov {version}, stamp 0x{:08x}, runs {}, programs {}", self.stamp, self.runs, self.programs)?;
        }

        for function in &self.functions {
            writeln!(
                writer,
                "===== {} ({}) @ {}:{}",
                function.name,
                function.ident,
                self.files.name(function.file),
                function.start_line
            )?;

            for (number, block) in function.blocks.iter().enumerate() {
                writeln!(writer, "Block : {number} Counter : {}", block.count)?;

                if !block.in_arcs.is_empty() {
                    write!(writer, "\tSource Edges : ")?;
                    for &arc in &block.in_arcs {
                        let arc = &function.arcs[arc];
                        write!(writer, "{} ({}), ", arc.source, arc.count)?;
                    }
                    writeln!(writer)?;
                }

                if !block.out_arcs.is_empty() {
                    write!(writer, "\tDestination Edges : ")?;
                    for &arc in &block.out_arcs {
                        let arc = &function.arcs[arc];
                        write!(writer, "{} ({}), ", arc.destination, arc.count)?;
                    }
                    writeln!(writer)?;
                }

                if !block.lines.is_empty() {
                    write!(writer, "\tLines : ")?;
                    for line in &block.lines {
                        write!(writer, "{}:{}, ", self.files.name(line.file), line.line)?;
                    }
                    writeln!(writer)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcov::GcovWriter;

    const ON_TREE: u32 = 1;

    /// `main` in a.c: entry(0) -> body(1, lines 2-3) -> exit(2); one instrumented arc.
    fn notes(version: &[u8; 4]) -> GcovWriter {
        let mut w = GcovWriter::notes(version);
        let _ = w
            .function(1, 0xaaaa, 0xbbbb, "main", "a.c", 1)
            .blocks(3)
            .arcs(0, &[(1, ON_TREE)])
            .arcs(1, &[(2, 0)])
            .lines(1, "a.c", &[2, 3]);
        w
    }

    fn data(version: &[u8; 4], count: u64) -> GcovWriter {
        let mut w = GcovWriter::data(version);
        let _ = w.data_function(1, 0xaaaa, 0xbbbb).arc_counters(&[count]).object_summary(1).program_summary();
        w
    }

    fn loaded(count: u64) -> GcovFile {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"407*").finish()).unwrap();
        file.read_data(&data(b"407*", count).finish()).unwrap();
        file
    }

    #[test]
    fn test_notes_structure() {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"407*").finish()).unwrap();

        assert_eq!(file.functions().len(), 1);
        let main = &file.functions()[0];
        assert_eq!(main.name, "main");
        assert_eq!(main.blocks.len(), 3);
        assert_eq!(main.arcs.len(), 2);
        assert_eq!(main.blocks[1].lines.iter().map(|l| l.line).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(file.files().name(main.file), "a.c");
    }

    #[test]
    fn test_notes_in_both_byte_orders() {
        let mut little = GcovFile::default();
        little.read_notes(&notes(b"407*").finish()).unwrap();

        let mut big = GcovFile::default();
        big.read_notes(&notes(b"407*").big_endian().finish()).unwrap();

        assert_eq!(little.functions(), big.functions());
    }

    #[test]
    fn test_notes_without_cfg_checksum() {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"402*").finish()).unwrap();
        file.read_data(&data(b"402*", 4).finish()).unwrap();
        assert_eq!(file.functions()[0].blocks[1].count, 4);
    }

    #[test]
    fn test_data_populates_counts() {
        let file = loaded(5);
        let counts: Vec<_> = file.functions()[0].blocks.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![5, 5, 5]);
        assert_eq!(file.runs(), 1);
        assert_eq!(file.programs(), 1);
    }

    #[test]
    fn test_data_file_is_not_notes() {
        let mut file = GcovFile::default();
        let err = file.read_notes(&data(b"407*", 1).finish()).unwrap_err();
        assert!(err.to_string().contains("expected a notes file"));
    }

    #[test]
    fn test_truncated_notes_are_rejected() {
        let bytes = notes(b"407*").finish();
        let mut file = GcovFile::default();
        assert!(file.read_notes(&bytes[..bytes.len() - 6]).is_err());
        assert!(file.functions().is_empty());
    }

    #[test]
    fn test_arcs_before_function_are_rejected() {
        let mut w = GcovWriter::notes(b"407*");
        let _ = w.arcs(0, &[(1, 0)]);
        let mut file = GcovFile::default();
        assert!(file.read_notes(&w.finish()).is_err());
    }

    #[test]
    fn test_arc_to_missing_block_is_rejected() {
        let mut w = GcovWriter::notes(b"407*");
        let _ = w.function(1, 0, 0, "f", "a.c", 1).blocks(2).arcs(0, &[(5, 0)]);
        let mut file = GcovFile::default();
        let err = file.read_notes(&w.finish()).unwrap_err();
        assert!(format!("{err:#}").contains("references block 5"));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let mut file = GcovFile::default();
        assert!(file.read_notes(&notes(b"A12*").finish()).is_err());
    }

    #[test]
    fn test_data_version_mismatch_leaves_graph_untouched() {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"407*").finish()).unwrap();
        let before = file.functions().to_vec();

        assert!(file.read_data(&data(b"408*", 9).finish()).is_err());
        assert_eq!(file.functions(), before.as_slice());
        assert_eq!(file.runs(), 0);
    }

    #[test]
    fn test_stamp_mismatch_is_rejected() {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"407*").finish()).unwrap();

        let mut w = data(b"407*", 1);
        let _ = w.stamp(0xdead_beef);
        let err = file.read_data(&w.finish()).unwrap_err();
        assert!(format!("{err:#}").contains("stamp mismatch"));
    }

    #[test]
    fn test_checksum_mismatch_is_rejected() {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"407*").finish()).unwrap();

        let mut w = GcovWriter::data(b"407*");
        let _ = w.data_function(1, 0x1111, 0xbbbb).arc_counters(&[3]);
        assert!(file.read_data(&w.finish()).is_err());
    }

    #[test]
    fn test_partial_data_is_not_applied() {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"407*").finish()).unwrap();

        // valid counters followed by a reference to an unknown function
        let mut w = data(b"407*", 8);
        let _ = w.data_function(99, 0, 0);
        assert!(file.read_data(&w.finish()).is_err());
        assert!(file.functions()[0].blocks.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_counter_count_mismatch_is_rejected() {
        let mut file = GcovFile::default();
        file.read_notes(&notes(b"407*").finish()).unwrap();

        let mut w = GcovWriter::data(b"407*");
        let _ = w.data_function(1, 0xaaaa, 0xbbbb).arc_counters(&[1, 2]);
        assert!(file.read_data(&w.finish()).is_err());
    }

    #[test]
    fn test_header_sniff() {
        assert!(GcovFile::has_data_format_header(&data(b"407*", 1).finish()));
        assert!(!GcovFile::has_data_format_header(&notes(b"407*").finish()));
        assert!(!GcovFile::has_data_format_header(b"hello"));
    }

    #[test]
    fn test_dump_lists_blocks_and_lines() {
        let file = loaded(2);
        let mut out = Vec::new();
        file.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("gcov 4.7, stamp 0x"));
        assert!(text.contains("===== main (1) @ a.c:1"));
        assert!(text.contains("Block : 1 Counter : 2"));
        assert!(text.contains("\tLines : a.c:2, a.c:3, "));
    }
}
