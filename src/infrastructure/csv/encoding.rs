// ============================================================
// ENCODING DETECTION
// ============================================================
// Best-effort sniffing of the text encoding of an uploaded CSV

use encoding_rs::{Encoding, ISO_8859_2, UTF_8, WINDOWS_1250, WINDOWS_1252};

/// Number of leading lines trial-decoded by the detector
pub const SAMPLE_LINES: usize = 16;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Encoding picked for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,

    /// Whether the file starts with a UTF-8 byte order mark
    pub has_bom: bool,
}

impl DetectedEncoding {
    pub fn name(&self) -> &'static str {
        if self.has_bom {
            "UTF-8 (BOM)"
        } else {
            self.encoding.name()
        }
    }

    /// Decode the whole buffer. `None` when a byte sequence is invalid for
    /// the detected encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        let body = if self.has_bom { &bytes[UTF8_BOM.len()..] } else { bytes };
        self.encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(|text| text.into_owned())
    }
}

/// Candidates in priority order after the BOM check: UTF-8, the two
/// Central-European code pages, then the Western-European fallback.
const CANDIDATES: [&Encoding; 4] = [UTF_8, WINDOWS_1250, ISO_8859_2, WINDOWS_1252];

/// Pick the first candidate that decodes the first [`SAMPLE_LINES`] lines
/// without error. Falls back to UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> DetectedEncoding {
    if bytes.starts_with(&UTF8_BOM) {
        let sample = leading_lines(&bytes[UTF8_BOM.len()..], SAMPLE_LINES);
        if UTF_8
            .decode_without_bom_handling_and_without_replacement(sample)
            .is_some()
        {
            return DetectedEncoding {
                encoding: UTF_8,
                has_bom: true,
            };
        }
    }

    let sample = leading_lines(bytes, SAMPLE_LINES);
    for encoding in CANDIDATES {
        if encoding
            .decode_without_bom_handling_and_without_replacement(sample)
            .is_some()
        {
            return DetectedEncoding {
                encoding,
                has_bom: false,
            };
        }
    }

    DetectedEncoding {
        encoding: UTF_8,
        has_bom: false,
    }
}

/// Prefix of `bytes` spanning at most `lines` newline-terminated lines.
/// Splitting on `\n` never cuts a UTF-8 sequence or a single-byte character.
fn leading_lines(bytes: &[u8], lines: usize) -> &[u8] {
    let mut seen = 0;
    for (idx, byte) in bytes.iter().enumerate() {
        if *byte == b'\n' {
            seen += 1;
            if seen == lines {
                return &bytes[..=idx];
            }
        }
    }
    bytes
}
