use crate::Result;
use ohno::{app_err, bail};

/// Byte order of a gcov file, determined by how its magic reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Which of the two gcov formats a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Notes,
    Data,
}

/// Identify a gcov file from its first four bytes.
#[must_use]
pub fn sniff(data: &[u8]) -> Option<(FileKind, Endian)> {
    match data.get(..4)? {
        b"gcno" => Some((FileKind::Notes, Endian::Big)),
        b"oncg" => Some((FileKind::Notes, Endian::Little)),
        b"gcda" => Some((FileKind::Data, Endian::Big)),
        b"adcg" => Some((FileKind::Data, Endian::Little)),
        _ => None,
    }
}

/// Cursor over the 32-bit words of a gcov file.
#[derive(Debug, Clone)]
pub struct GcovBuffer<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> GcovBuffer<'a> {
    /// Open a buffer positioned just past the magic.
    pub fn open(data: &'a [u8]) -> Result<(Self, FileKind)> {
        let (kind, endian) = sniff(data).ok_or_else(|| app_err!("not a gcov file: unrecognized magic"))?;
        Ok((Self { data, position: 4, endian }, kind))
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .ok_or_else(|| app_err!("length overflow at offset {}", self.position))?;

        let Some(bytes) = self.data.get(self.position..end) else {
            bail!("unexpected end of file at offset {} (wanted {len} bytes)", self.position);
        };

        self.position = end;
        Ok(bytes)
    }

    pub fn read_word(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into()?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    /// Read a 64-bit counter stored as two words, low word first.
    pub fn read_counter(&mut self) -> Result<u64> {
        let low = self.read_word()?;
        let high = self.read_word()?;
        Ok((u64::from(high) << 32) | u64::from(low))
    }

    /// Read a length-prefixed, NUL-padded string.
    pub fn read_string(&mut self) -> Result<String> {
        let words = self.read_word()? as usize;
        let len = words
            .checked_mul(4)
            .ok_or_else(|| app_err!("string length overflow at offset {}", self.position))?;
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Split off the payload of a record of `words` words, advancing past it.
    pub fn take_record(&mut self, words: u32) -> Result<Self> {
        let len = (words as usize)
            .checked_mul(4)
            .ok_or_else(|| app_err!("record length overflow at offset {}", self.position))?;
        let start = self.position;
        let end = start + self.read_bytes(len)?.len();
        let data = self.data;

        Ok(Self {
            data: &data[..end],
            position: start,
            endian: self.endian,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_all_magics() {
        assert_eq!(sniff(b"gcno...."), Some((FileKind::Notes, Endian::Big)));
        assert_eq!(sniff(b"oncg...."), Some((FileKind::Notes, Endian::Little)));
        assert_eq!(sniff(b"gcda"), Some((FileKind::Data, Endian::Big)));
        assert_eq!(sniff(b"adcg"), Some((FileKind::Data, Endian::Little)));
    }

    #[test]
    fn test_sniff_rejects_short_or_unknown() {
        assert_eq!(sniff(b"adc"), None);
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"ELF\x7f"), None);
    }

    #[test]
    fn test_words_follow_endianness() {
        let (mut le, _) = GcovBuffer::open(b"adcg\x01\x02\x03\x04").unwrap();
        assert_eq!(le.read_word().unwrap(), 0x0403_0201);

        let (mut be, _) = GcovBuffer::open(b"gcda\x01\x02\x03\x04").unwrap();
        assert_eq!(be.read_word().unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_counter_is_low_word_first() {
        let (mut buf, _) = GcovBuffer::open(b"adcg\x02\x00\x00\x00\x01\x00\x00\x00").unwrap();
        assert_eq!(buf.read_counter().unwrap(), 0x1_0000_0002);
        assert!(buf.is_at_end());
    }

    #[test]
    fn test_string_strips_padding() {
        let (mut buf, _) = GcovBuffer::open(b"adcg\x02\x00\x00\x00main\x00\x00\x00\x00").unwrap();
        assert_eq!(buf.read_string().unwrap(), "main");
    }

    #[test]
    fn test_empty_string() {
        let (mut buf, _) = GcovBuffer::open(b"adcg\x00\x00\x00\x00").unwrap();
        assert_eq!(buf.read_string().unwrap(), "");
    }

    #[test]
    fn test_truncated_word_is_an_error() {
        let (mut buf, _) = GcovBuffer::open(b"adcg\x01\x02").unwrap();
        let err = buf.read_word().unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_record_is_bounded() {
        let (mut buf, _) = GcovBuffer::open(b"adcg\x01\x00\x00\x00\x02\x00\x00\x00").unwrap();
        let mut record = buf.take_record(1).unwrap();
        assert_eq!(record.read_word().unwrap(), 1);
        assert!(record.read_word().is_err());
        assert_eq!(buf.read_word().unwrap(), 2);
    }

    #[test]
    fn test_record_longer_than_file_is_an_error() {
        let (mut buf, _) = GcovBuffer::open(b"adcg\x01\x00\x00\x00").unwrap();
        assert!(buf.take_record(2).is_err());
    }
}
