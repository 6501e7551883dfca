use super::buffer::GcovBuffer;
use super::file::FileTable;
use super::version::GcovVersion;
use crate::Result;
use ohno::bail;

const ARC_ON_TREE: u32 = 1 << 0;
const ARC_FAKE: u32 = 1 << 1;
const ARC_FALLTHROUGH: u32 = 1 << 2;

/// A (file, line) position attached to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLine {
    /// Index into the graph's [`FileTable`].
    pub file: usize,
    pub line: u32,
}

/// An edge of a function's control-flow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcovArc {
    pub source: usize,
    pub destination: usize,
    pub flags: u32,
    pub count: u64,
}

impl GcovArc {
    /// On-tree arcs aren't instrumented; their counts are derived from the others.
    #[must_use]
    pub const fn is_on_tree(&self) -> bool {
        self.flags & ARC_ON_TREE != 0
    }

    /// Fake arcs model calls that may not return.
    #[must_use]
    pub const fn is_fake(&self) -> bool {
        self.flags & ARC_FAKE != 0
    }

    #[must_use]
    pub const fn is_fallthrough(&self) -> bool {
        self.flags & ARC_FALLTHROUGH != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcovBlock {
    pub lines: Vec<SourceLine>,
    pub in_arcs: Vec<usize>,
    pub out_arcs: Vec<usize>,
    pub count: u64,
}

impl GcovBlock {
    #[must_use]
    pub fn is_on(&self, line: SourceLine) -> bool {
        self.lines.contains(&line)
    }

    /// The last line the block spans, which is where its branches are attributed.
    #[must_use]
    pub fn last_line(&self) -> Option<SourceLine> {
        self.lines.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcovFunction {
    pub ident: u32,
    pub line_checksum: u32,
    pub cfg_checksum: u32,
    pub name: String,
    pub file: usize,
    pub start_line: u32,
    pub blocks: Vec<GcovBlock>,
    pub arcs: Vec<GcovArc>,
}

impl GcovFunction {
    /// Parse a notes FUNCTION record.
    pub fn read(record: &mut GcovBuffer<'_>, version: GcovVersion, files: &mut FileTable) -> Result<Self> {
        let ident = record.read_word()?;
        let line_checksum = record.read_word()?;
        let cfg_checksum = if version.has_cfg_checksum() { record.read_word()? } else { 0 };
        let name = record.read_string()?;
        let filename = record.read_string()?;
        let start_line = record.read_word()?;

        Ok(Self {
            ident,
            line_checksum,
            cfg_checksum,
            name,
            file: files.intern(&filename),
            start_line,
            blocks: Vec::new(),
            arcs: Vec::new(),
        })
    }

    pub fn set_block_count(&mut self, count: u32) -> Result<()> {
        if !self.blocks.is_empty() {
            bail!("duplicate blocks record for function '{}'", self.name);
        }

        self.blocks = vec![GcovBlock::default(); count as usize];
        Ok(())
    }

    /// Parse an ARCS record: a source block followed by (destination, flags) pairs.
    pub fn read_arcs(&mut self, record: &mut GcovBuffer<'_>, words: u32) -> Result<()> {
        let source = self.block_index(record.read_word()?)?;

        for _ in 0..words.saturating_sub(1) / 2 {
            let destination = self.block_index(record.read_word()?)?;
            let flags = record.read_word()?;

            let index = self.arcs.len();
            self.arcs.push(GcovArc {
                source,
                destination,
                flags,
                count: 0,
            });
            self.blocks[source].out_arcs.push(index);
            self.blocks[destination].in_arcs.push(index);
        }

        Ok(())
    }

    /// Parse a LINES record. A zero line number introduces a file name; an empty name ends the list.
    pub fn read_lines(&mut self, record: &mut GcovBuffer<'_>, files: &mut FileTable) -> Result<()> {
        let block = self.block_index(record.read_word()?)?;
        let mut file = self.file;

        loop {
            let line = record.read_word()?;
            if line != 0 {
                self.blocks[block].lines.push(SourceLine { file, line });
                continue;
            }

            let name = record.read_string()?;
            if name.is_empty() {
                return Ok(());
            }
            file = files.intern(&name);
        }
    }

    fn block_index(&self, number: u32) -> Result<usize> {
        let index = number as usize;
        if index >= self.blocks.len() {
            bail!(
                "function '{}' references block {number} but has only {} blocks",
                self.name,
                self.blocks.len()
            );
        }
        Ok(index)
    }

    /// Number of counters the data file must supply for this function.
    #[must_use]
    pub fn instrumented_arc_count(&self) -> usize {
        self.arcs.iter().filter(|arc| !arc.is_on_tree()).count()
    }

    /// Add data-file counters to the instrumented arcs, in arc order.
    pub fn add_counters(&mut self, counters: &[u64]) -> Result<()> {
        let expected = self.instrumented_arc_count();
        if counters.len() != expected {
            bail!(
                "function '{}' expects {expected} arc counters but the data file has {}",
                self.name,
                counters.len()
            );
        }

        let instrumented = self.arcs.iter_mut().filter(|arc| !arc.is_on_tree());
        for (arc, &counter) in instrumented.zip(counters) {
            arc.count = arc.count.saturating_add(counter);
        }
        Ok(())
    }

    /// Derive block counts and on-tree arc counts from the instrumented arcs.
    ///
    /// Flow is conserved at every block: a block runs as often as its in-arcs are taken, and as
    /// often as its out-arcs are taken. Values that can't be determined stay zero.
    pub fn solve(&mut self) {
        let Self { blocks, arcs, .. } = self;

        let mut arc_known: Vec<bool> = arcs.iter().map(|arc| !arc.is_on_tree()).collect();
        let mut block_known = vec![false; blocks.len()];
        for arc in arcs.iter_mut().filter(|arc| arc.is_on_tree()) {
            arc.count = 0;
        }

        let mut changed = true;
        while changed {
            changed = false;

            for (index, block) in blocks.iter_mut().enumerate() {
                if !block_known[index] {
                    let known_total = |list: &[usize]| -> Option<u64> {
                        (!list.is_empty() && list.iter().all(|&a| arc_known[a]))
                            .then(|| list.iter().map(|&a| arcs[a].count).fold(0, u64::saturating_add))
                    };

                    if let Some(total) = known_total(&block.in_arcs).or_else(|| known_total(&block.out_arcs)) {
                        block.count = total;
                        block_known[index] = true;
                        changed = true;
                    }
                }

                if block_known[index] {
                    for list in [&block.in_arcs, &block.out_arcs] {
                        let mut unknown = list.iter().copied().filter(|&a| !arc_known[a]);
                        if let (Some(missing), None) = (unknown.next(), unknown.next()) {
                            let known = list
                                .iter()
                                .filter(|&&a| a != missing)
                                .map(|&a| arcs[a].count)
                                .fold(0, u64::saturating_add);
                            arcs[missing].count = block.count.saturating_sub(known);
                            arc_known[missing] = true;
                            changed = true;
                        }
                    }
                }
            }
        }
    }

    /// How often the function was entered.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.blocks.first().map_or(0, |block| block.count)
    }

    /// How often the function returned: the real (non-fake) flow into blocks without successors.
    #[must_use]
    pub fn return_count(&self) -> u64 {
        self.arcs
            .iter()
            .filter(|arc| !arc.is_fake() && arc.destination != 0 && self.blocks[arc.destination].out_arcs.is_empty())
            .map(|arc| arc.count)
            .fold(0, u64::saturating_add)
    }

    /// Indices of the blocks that carry source code, i.e. everything but entry and exit blocks.
    pub fn body_blocks(&self) -> impl Iterator<Item = (usize, &GcovBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, block)| !block.out_arcs.is_empty())
    }

    /// Out-arcs of `block` that model real control flow, i.e. everything but fake call arcs.
    pub fn real_out_arcs(&self, block: usize) -> impl Iterator<Item = &GcovArc> {
        self.blocks[block]
            .out_arcs
            .iter()
            .map(|&arc| &self.arcs[arc])
            .filter(|arc| !arc.is_fake())
    }

    /// Whether `block` ends in a call, which the compiler marks with a fake out-arc.
    #[must_use]
    pub fn is_call_site(&self, block: usize) -> bool {
        self.blocks[block].out_arcs.iter().any(|&arc| self.arcs[arc].is_fake())
    }
}
