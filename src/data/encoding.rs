use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{CurateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// UTF-16 with byte-order detection; little endian when there is no BOM.
    Utf16,
    Utf16Le,
    Utf16Be,
    Windows1252,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16 => "utf-16",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Windows1252 => "cp1252",
        }
    }

    /// Decode raw bytes. Returns None when the bytes are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).ok()
            }
            Self::Utf16 => match bytes {
                [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
                [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
                _ => decode_utf16(bytes, u16::from_le_bytes),
            },
            Self::Utf16Le => {
                let bytes = bytes.strip_prefix(&[0xFF, 0xFE]).unwrap_or(bytes);
                decode_utf16(bytes, u16::from_le_bytes)
            }
            Self::Utf16Be => {
                let bytes = bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes);
                decode_utf16(bytes, u16::from_be_bytes)
            }
            Self::Windows1252 => bytes.iter().map(|&b| windows_1252_char(b)).collect(),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextEncoding {
    type Err = CurateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16" | "utf16" => Ok(Self::Utf16),
            "utf-16le" | "utf-16-le" => Ok(Self::Utf16Le),
            "utf-16be" | "utf-16-be" => Ok(Self::Utf16Be),
            "cp1252" | "windows-1252" => Ok(Self::Windows1252),
            _ => Err(CurateError::UnknownEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = CurateError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Read a whole file and decode it.
pub fn read_text(path: impl AsRef<Path>, encoding: TextEncoding) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| CurateError::io(path, err))?;
    encoding.decode(&bytes).ok_or_else(|| CurateError::Decode {
        path: path.to_path_buf(),
        encoding: encoding.to_string(),
    })
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<std::result::Result<String, _>>().ok()
}

/// 0x80..=0x9F differ from Latin-1; five of those bytes are unassigned.
fn windows_1252_char(byte: u8) -> Option<char> {
    const HIGH: [Option<char>; 32] = [
        Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
        Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
        Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
        Some('\u{0152}'), None, Some('\u{017D}'), None,
        None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
        Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
        Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
        Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        _ => Some(char::from(byte)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn utf16_detects_little_endian_bom() {
        let bytes = utf16le_with_bom("TAG frt 01-frt-1001\n");
        assert_eq!(
            TextEncoding::Utf16.decode(&bytes).as_deref(),
            Some("TAG frt 01-frt-1001\n")
        );
    }

    #[test]
    fn utf16_detects_big_endian_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "ok".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(TextEncoding::Utf16.decode(&bytes).as_deref(), Some("ok"));
    }

    #[test]
    fn utf16_rejects_odd_length() {
        assert_eq!(TextEncoding::Utf16Le.decode(&[0x41, 0x00, 0x42]), None);
    }

    #[test]
    fn utf8_strips_bom() {
        assert_eq!(
            TextEncoding::Utf8.decode(b"\xEF\xBB\xBFtxID").as_deref(),
            Some("txID")
        );
    }

    #[test]
    fn windows_1252_maps_high_range() {
        assert_eq!(
            TextEncoding::Windows1252.decode(b"caf\xE9 \x80").as_deref(),
            Some("café €")
        );
        assert_eq!(TextEncoding::Windows1252.decode(b"\x81"), None);
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!("UTF-16".parse::<TextEncoding>().ok(), Some(TextEncoding::Utf16));
        assert_eq!("utf_8".parse::<TextEncoding>().ok(), Some(TextEncoding::Utf8));
        assert_eq!(
            "windows-1252".parse::<TextEncoding>().ok(),
            Some(TextEncoding::Windows1252)
        );
        assert!("latin-9".parse::<TextEncoding>().is_err());
    }
}
