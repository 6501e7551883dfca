use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::bail;

/// Format version stamped into every gcov file, e.g. `407*` for 4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcovVersion {
    tag: [u8; 4],
}

impl GcovVersion {
    /// Decode a version word as read in the file's own byte order.
    ///
    /// Only the classic record layout, used by majors 4 through 7, is supported.
    pub fn from_word(word: u32) -> Result<Self> {
        let tag = word.to_be_bytes();
        let [major, minor_hi, minor_lo, _status] = tag;

        if !(b'4'..=b'7').contains(&major) || !minor_hi.is_ascii_digit() || !minor_lo.is_ascii_digit() {
            bail!("unsupported gcov version '{}'", String::from_utf8_lossy(&tag));
        }

        Ok(Self { tag })
    }

    #[must_use]
    pub const fn major(self) -> u8 {
        self.tag[0] - b'0'
    }

    #[must_use]
    pub const fn minor(self) -> u8 {
        (self.tag[1] - b'0') * 10 + (self.tag[2] - b'0')
    }

    /// Function records carry a CFG checksum starting with 4.7.
    #[must_use]
    pub const fn has_cfg_checksum(self) -> bool {
        self.major() > 4 || self.minor() >= 7
    }
}

impl Display for GcovVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_classic_versions() {
        let v402 = GcovVersion::from_word(u32::from_be_bytes(*b"402*")).unwrap();
        assert_eq!((v402.major(), v402.minor()), (4, 2));
        assert!(!v402.has_cfg_checksum());

        let v407 = GcovVersion::from_word(u32::from_be_bytes(*b"407*")).unwrap();
        assert_eq!(v407.to_string(), "4.7");
        assert!(v407.has_cfg_checksum());

        let v703 = GcovVersion::from_word(u32::from_be_bytes(*b"703*")).unwrap();
        assert!(v703.has_cfg_checksum());
    }

    #[test]
    fn test_reject_modern_and_garbage_versions() {
        assert!(GcovVersion::from_word(u32::from_be_bytes(*b"B01*")).is_err());
        assert!(GcovVersion::from_word(u32::from_be_bytes(*b"801*")).is_err());
        assert!(GcovVersion::from_word(0).is_err());
    }
}
