// THEORY:
// Output codecs are identified by a four character code. The container
// libraries pack the four bytes little-endian into one integer, but users type
// the code as text, so `FourCc` keeps the bytes and offers both views.
//
// Only ASCII alphanumerics and the space character are accepted. Three codes
// in real use contain spaces ("RLE ", "Y16 ", "Y8  "); anything else with
// punctuation or control characters is a typo rather than a codec.

use crate::error::ParamError;
use std::fmt;
use std::str::FromStr;

/// A validated four character codec identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// The writer default used when no code is given on the command line.
    pub const DEFAULT: FourCc = FourCc(*b"IYUV");

    pub fn parse(code: &str) -> Result<Self, ParamError> {
        let bytes = code.as_bytes();
        if bytes.len() != 4 {
            return Err(ParamError::InvalidCodec {
                code: code.to_string(),
                reason: "must be exactly 4 characters long",
            });
        }
        if !bytes.iter().all(|&c| Self::is_code_char(c)) {
            return Err(ParamError::InvalidCodec {
                code: code.to_string(),
                reason: "only letters, digits and spaces are allowed",
            });
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Rebuilds a code from its packed integer form.
    pub fn from_packed(packed: u32) -> Result<Self, ParamError> {
        let bytes = packed.to_le_bytes();
        match std::str::from_utf8(&bytes) {
            Ok(text) => Self::parse(text),
            Err(_) => Err(ParamError::InvalidCodec {
                code: format!("{packed:#010x}"),
                reason: "packed value is not ASCII",
            }),
        }
    }

    /// `c0 | c1 << 8 | c2 << 16 | c3 << 24`, the layout video writers expect.
    pub fn packed(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn chars(&self) -> [char; 4] {
        self.0.map(char::from)
    }

    fn is_code_char(c: u8) -> bool {
        c.is_ascii_alphanumeric() || c == b' '
    }
}

impl Default for FourCc {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for FourCc {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Every byte is ASCII by construction.
        for c in self.chars() {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_codes_with_trailing_spaces() {
        for code in ["Y16 ", "RLE ", "Y8  ", "MJPG", "mp4v", "X264"] {
            let parsed = FourCc::parse(code).expect("code should be accepted");
            assert_eq!(parsed.to_string(), code);
        }
    }

    #[test]
    fn rejects_punctuation_and_wrong_lengths() {
        assert!(FourCc::parse("AB!1").is_err());
        assert!(FourCc::parse("AB-1").is_err());
        assert!(FourCc::parse("ABC").is_err());
        assert!(FourCc::parse("ABCDE").is_err());
        assert!(FourCc::parse("").is_err());
        assert!(FourCc::parse("AB\t1").is_err());
    }

    #[test]
    fn packs_little_endian() {
        let code = FourCc::parse("MJPG").unwrap();
        let expected = (b'M' as u32) | (b'J' as u32) << 8 | (b'P' as u32) << 16 | (b'G' as u32) << 24;
        assert_eq!(code.packed(), expected);
        assert_eq!(FourCc::from_packed(expected).unwrap(), code);
    }

    #[test]
    fn packed_value_with_illegal_bytes_is_rejected() {
        assert!(FourCc::from_packed(0).is_err());
        assert!(FourCc::from_packed(u32::from_le_bytes(*b"A!BC")).is_err());
    }
}
