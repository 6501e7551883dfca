use super::buffer::Endian;
use super::file::{
    TAG_ARCS, TAG_BLOCKS, TAG_COUNTER_ARCS, TAG_FUNCTION, TAG_LINES, TAG_OBJECT_SUMMARY, TAG_PROGRAM_SUMMARY,
};
use bytes::{BufMut, BytesMut};

const DEFAULT_STAMP: u32 = 0x1234_5678;
const SUMMARY_WORDS: u32 = 9;

#[derive(Debug, Clone)]
enum Item {
    Word(u32),
    Str(String),
}

impl Item {
    /// Strings always carry at least one NUL, except the empty string which is a bare zero length.
    #[expect(clippy::cast_possible_truncation, reason = "fixture strings are short")]
    fn words(&self) -> u32 {
        match self {
            Self::Word(_) => 1,
            Self::Str(s) if s.is_empty() => 1,
            Self::Str(s) => 1 + (s.len() as u32 + 4) / 4,
        }
    }
}

/// Builds gcov notes and data files in memory.
///
/// Records are kept symbolically until [`GcovWriter::finish`], so the byte order can be chosen last.
#[derive(Debug, Clone)]
pub struct GcovWriter {
    magic: [u8; 4],
    version: [u8; 4],
    stamp: u32,
    endian: Endian,
    records: Vec<(u32, Vec<Item>)>,
}

impl GcovWriter {
    #[must_use]
    pub fn notes(version: &[u8; 4]) -> Self {
        Self::new(*b"gcno", version)
    }

    #[must_use]
    pub fn data(version: &[u8; 4]) -> Self {
        Self::new(*b"gcda", version)
    }

    fn new(magic: [u8; 4], version: &[u8; 4]) -> Self {
        Self {
            magic,
            version: *version,
            stamp: DEFAULT_STAMP,
            endian: Endian::Little,
            records: Vec::new(),
        }
    }

    pub const fn big_endian(&mut self) -> &mut Self {
        self.endian = Endian::Big;
        self
    }

    pub const fn stamp(&mut self, stamp: u32) -> &mut Self {
        self.stamp = stamp;
        self
    }

    fn has_cfg_checksum(&self) -> bool {
        self.version[0] != b'4' || self.version[1..3] >= b"07"[..]
    }

    fn record(&mut self, tag: u32, payload: Vec<Item>) -> &mut Self {
        self.records.push((tag, payload));
        self
    }

    /// A notes FUNCTION record.
    pub fn function(&mut self, ident: u32, line_checksum: u32, cfg_checksum: u32, name: &str, file: &str, line: u32) -> &mut Self {
        let mut payload = vec![Item::Word(ident), Item::Word(line_checksum)];
        if self.has_cfg_checksum() {
            payload.push(Item::Word(cfg_checksum));
        }
        payload.extend([Item::Str(name.to_string()), Item::Str(file.to_string()), Item::Word(line)]);
        self.record(TAG_FUNCTION, payload)
    }

    pub fn blocks(&mut self, count: u32) -> &mut Self {
        self.record(TAG_BLOCKS, vec![Item::Word(0); count as usize])
    }

    /// Arcs leaving `source`, as (destination, flags) pairs.
    pub fn arcs(&mut self, source: u32, arcs: &[(u32, u32)]) -> &mut Self {
        let mut payload = vec![Item::Word(source)];
        for &(destination, flags) in arcs {
            payload.extend([Item::Word(destination), Item::Word(flags)]);
        }
        self.record(TAG_ARCS, payload)
    }

    pub fn lines(&mut self, block: u32, file: &str, lines: &[u32]) -> &mut Self {
        let mut payload = vec![Item::Word(block), Item::Word(0), Item::Str(file.to_string())];
        payload.extend(lines.iter().map(|&line| Item::Word(line)));
        payload.extend([Item::Word(0), Item::Str(String::new())]);
        self.record(TAG_LINES, payload)
    }

    /// A data FUNCTION record selecting the function that following counters belong to.
    pub fn data_function(&mut self, ident: u32, line_checksum: u32, cfg_checksum: u32) -> &mut Self {
        let mut payload = vec![Item::Word(ident), Item::Word(line_checksum)];
        if self.has_cfg_checksum() {
            payload.push(Item::Word(cfg_checksum));
        }
        self.record(TAG_FUNCTION, payload)
    }

    #[expect(clippy::cast_possible_truncation, reason = "counters are split into two words")]
    pub fn arc_counters(&mut self, counters: &[u64]) -> &mut Self {
        let payload = counters
            .iter()
            .flat_map(|&c| [Item::Word(c as u32), Item::Word((c >> 32) as u32)])
            .collect();
        self.record(TAG_COUNTER_ARCS, payload)
    }

    pub fn object_summary(&mut self, runs: u32) -> &mut Self {
        let mut payload = vec![Item::Word(0); SUMMARY_WORDS as usize];
        payload[1] = Item::Word(1);
        payload[2] = Item::Word(runs);
        self.record(TAG_OBJECT_SUMMARY, payload)
    }

    pub fn program_summary(&mut self) -> &mut Self {
        self.record(TAG_PROGRAM_SUMMARY, vec![Item::Word(0); SUMMARY_WORDS as usize])
    }

    /// Serialize everything written so far.
    #[must_use]
    pub fn finish(&self) -> Vec<u8> {
        let mut out = BytesMut::new();

        let mut magic = self.magic;
        if self.endian == Endian::Little {
            magic.reverse();
        }
        out.put_slice(&magic);

        let put_word = |out: &mut BytesMut, word: u32| match self.endian {
            Endian::Little => out.put_u32_le(word),
            Endian::Big => out.put_u32(word),
        };

        put_word(&mut out, u32::from_be_bytes(self.version));
        put_word(&mut out, self.stamp);

        for (tag, payload) in &self.records {
            put_word(&mut out, *tag);
            put_word(&mut out, payload.iter().map(Item::words).sum());

            for item in payload {
                match item {
                    Item::Word(word) => put_word(&mut out, *word),
                    Item::Str(s) => {
                        let words = item.words() - 1;
                        put_word(&mut out, words);
                        out.put_slice(s.as_bytes());
                        out.put_bytes(0, words as usize * 4 - s.len());
                    }
                }
            }
        }

        out.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcov::buffer::{FileKind, GcovBuffer, sniff};

    #[test]
    fn test_magic_follows_byte_order() {
        assert_eq!(sniff(&GcovWriter::notes(b"407*").finish()), Some((FileKind::Notes, Endian::Little)));
        assert_eq!(
            sniff(&GcovWriter::data(b"407*").big_endian().finish()),
            Some((FileKind::Data, Endian::Big))
        );
    }

    #[test]
    fn test_strings_are_padded_with_nul() {
        let mut w = GcovWriter::notes(b"402*");
        let _ = w.function(7, 1, 2, "main", "a.c", 3);
        let bytes = w.finish();

        let (mut buf, _) = GcovBuffer::open(&bytes).unwrap();
        let _version = buf.read_word().unwrap();
        let _stamp = buf.read_word().unwrap();
        assert_eq!(buf.read_word().unwrap(), TAG_FUNCTION);
        // ident, checksum, "main" (1 + 2 words), "a.c" (1 + 1 words), line
        assert_eq!(buf.read_word().unwrap(), 8);
        let mut record = buf.take_record(8).unwrap();
        assert_eq!(record.read_word().unwrap(), 7);
        assert_eq!(record.read_word().unwrap(), 1);
        assert_eq!(record.read_string().unwrap(), "main");
        assert_eq!(record.read_string().unwrap(), "a.c");
        assert_eq!(record.read_word().unwrap(), 3);
        assert!(buf.is_at_end());
    }
}
