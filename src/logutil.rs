//! Logging helpers that keep binary frames and operator input on a single log line.

use crate::kiss::{FEND, FESC};

/// Hex-encode at most `max` bytes, appending `..` when the input was longer.
pub fn hex_snippet(data: &[u8], max: usize) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(data.len().min(max) * 2 + 2);
    for b in data.iter().take(max) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    if data.len() > max {
        out.push_str("..");
    }
    out
}

/// Render raw serial input as one printable log line.
///
/// The KISS delimiter and escape bytes show as `<FEND>` and `<FESC>`, which makes
/// a host that starts framing while the text CLI is active easy to spot. Other
/// non-printable bytes become `\r`, `\n`, `\t` or `\xNN`; input past 120 bytes
/// is cut with `..`.
pub fn escape_serial(data: &[u8]) -> String {
    use std::fmt::Write;
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(data.len().min(MAX_PREVIEW) + 8);
    for &b in data.iter().take(MAX_PREVIEW) {
        match b {
            FEND => out.push_str("<FEND>"),
            FESC => out.push_str("<FESC>"),
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(&mut out, "\\x{:02X}", b);
            }
        }
    }
    if data.len() > MAX_PREVIEW {
        out.push_str("..");
    }
    out
}

/// Parse a hex string, ignoring whitespace, `:` and `-` separators.
pub fn parse_hex(s: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b'-')
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_kiss_bytes_and_controls() {
        assert_eq!(escape_serial(b"set\tkiss\r\n"), "set\\tkiss\\r\\n");
        assert_eq!(
            escape_serial(&[0xC0, 0x00, b'h', 0xDB, 0xDC]),
            "<FEND>\\x00h<FESC>\\xDC"
        );
        assert_eq!(escape_serial(b"a\\b"), "a\\\\b");
    }

    #[test]
    fn long_input_is_cut() {
        let line = escape_serial(&[b'x'; 200]);
        assert_eq!(line.len(), 122);
        assert!(line.ends_with(".."));
    }

    #[test]
    fn hex_snippet_caps_output() {
        assert_eq!(hex_snippet(&[0xc0, 0x00, 0xdb], 8), "c000db");
        assert_eq!(hex_snippet(&[1, 2, 3, 4], 2), "0102..");
    }

    #[test]
    fn parses_separated_hex() {
        assert_eq!(parse_hex("c0 00:41-c0"), Some(vec![0xc0, 0x00, 0x41, 0xc0]));
        assert_eq!(parse_hex("abc"), None);
        assert_eq!(parse_hex("zz"), None);
    }
}
