//! Byte-histogram encoding detection and transcoding for the text blobs
//! this crate rewrites.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("windows-1251 payload could not be re-encoded as utf-8")]
    Transcode,
}

/// The classification a blob's content falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingLabel {
    /// Fewer than 3 bytes; too short to classify.
    TooShort,
    /// UTF-8 byte-order mark.
    Utf8Bom,
    /// An `<?xml ... encoding="utf-8"?>` (or `UTF-8`) declaration.
    Utf8Xml,
    /// No byte >= 0x80 anywhere in the sampled prefix.
    Ascii,
    /// High-bit bytes present but overwhelmingly the three single-byte
    /// windows-1251 punctuation codepoints (nbsp, left/right quote).
    WinDet,
    /// High-bit bytes present and dominated by UTF-8 two-byte lead bytes
    /// for Cyrillic (0xD0/0xD1).
    Utf8Det,
    /// Not classifiable; left untouched apart from line-ending cleanup.
    Unknown,
}

const XML_UTF8_LOWER: &[u8] = br#"<?xml version="1.0" encoding="utf-8""#;
const XML_UTF8_UPPER: &[u8] = br#"<?xml version="1.0" encoding="UTF-8""#;
const XML_WIN1251: &[u8] = br#"<?xml version="1.0" encoding="windows-1251""#;

/// Classifies `buf` by sampling its first 8192 bytes for a histogram of
/// high-bit byte frequencies.
pub fn detect(buf: &[u8]) -> EncodingLabel {
    if buf.len() < 3 {
        return EncodingLabel::TooShort;
    }

    if buf[0] == 0xEF && buf[1] == 0xBB && buf[2] == 0xBF {
        return EncodingLabel::Utf8Bom;
    }

    if buf.starts_with(XML_UTF8_LOWER) || buf.starts_with(XML_UTF8_UPPER) {
        return EncodingLabel::Utf8Xml;
    }

    let winxml = buf.starts_with(XML_WIN1251);

    let read_len = buf.len().min(8192);
    let mut histo = [0u32; 256];
    for &b in &buf[..read_len] {
        histo[b as usize] += 1;
    }

    let total_8bit: u32 = histo[128..256].iter().sum();
    if total_8bit == 0 {
        return EncodingLabel::Ascii;
    }

    if total_8bit == histo[0xA0] + histo[0x93] + histo[0x94] && !winxml {
        return EncodingLabel::WinDet;
    }

    let d0d1 = histo[0xD0] + histo[0xD1];
    if d0d1 > 0 {
        let utfd = d0d1 as f64 / (total_8bit - d0d1) as f64;
        if utfd > 0.9 && !winxml {
            return EncodingLabel::Utf8Det;
        }
    }

    let mut c0ff: u32 = histo[0xC0..=0xFF].iter().sum();
    c0ff += histo[0xA0] + histo[0x93] + histo[0x94];

    let win = c0ff as f64 / total_8bit as f64;
    if (win > 0.95 || winxml) && histo[0x98] == 0 {
        return EncodingLabel::WinDet;
    }

    // Declared windows-1251 but the histogram didn't confirm it: left
    // classified as unknown rather than trusting the declaration alone.
    EncodingLabel::Unknown
}

/// Line-ending and stray-markup cleanup applied to every text blob
/// regardless of its detected encoding: strips a stray BOM, normalizes
/// CRLF to LF, fixes the `<speach>` typo, then collapses runs of blank
/// lines and trailing spaces before a newline to a fixed point.
pub fn normalize_text(payload: &[u8]) -> Vec<u8> {
    let mut text = String::from_utf8_lossy(payload).into_owned();
    text = text.replace('\u{feff}', "");
    text = text.replace("\r\n", "\n");
    text = text.replace("<speach", "<speech");
    text = text.replace("</speach>", "</speech>");

    loop {
        let next = text
            .replace("\n\n\n\n", "\n\n")
            .replace("\n\n\n", "\n\n")
            .replace(" \n", "\n");
        if next == text {
            break;
        }
        text = next;
    }

    text.into_bytes()
}

/// Transcodes a windows-1251 payload to UTF-8, replacing the stray 0x98
/// byte (outside the windows-1251 code page) with a space first and
/// rewriting the XML encoding declaration if present.
pub fn transcode_windows1251(payload: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let cleaned: Vec<u8> = payload.iter().map(|&b| if b == 0x98 { b' ' } else { b }).collect();
    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1251.decode(&cleaned);
    if had_errors {
        return Err(EncodingError::Transcode);
    }
    let fixed = decoded.replace(
        r#"<?xml version="1.0" encoding="windows-1251""#,
        r#"<?xml version="1.0" encoding="utf-8""#,
    );
    Ok(fixed.into_bytes())
}

/// Runs the full per-blob pipeline: detect, transcode if needed,
/// normalize. Returns the possibly-rewritten payload; `TooShort` and
/// `Unknown` pass through completely untouched.
pub fn convert_payload(buf: &[u8]) -> Result<(EncodingLabel, Vec<u8>), EncodingError> {
    let label = detect(buf);
    let out = match label {
        EncodingLabel::Utf8Xml | EncodingLabel::Utf8Det | EncodingLabel::Ascii => {
            normalize_text(buf)
        }
        EncodingLabel::Utf8Bom => normalize_text(&buf[3..]),
        EncodingLabel::WinDet => {
            let transcoded = transcode_windows1251(buf)?;
            normalize_text(&transcoded)
        }
        EncodingLabel::TooShort | EncodingLabel::Unknown => buf.to_vec(),
    };
    Ok((label, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_buffer_is_too_short() {
        assert_eq!(detect(b"ab"), EncodingLabel::TooShort);
    }

    #[test]
    fn pure_ascii_is_ascii() {
        assert_eq!(detect(b"hello world\n"), EncodingLabel::Ascii);
    }

    #[test]
    fn utf8_bom_is_detected_and_stripped() {
        let mut buf = vec![0xEF, 0xBB, 0xBF];
        buf.extend_from_slice(b"hello\n");
        assert_eq!(detect(&buf), EncodingLabel::Utf8Bom);
        let (_, out) = convert_payload(&buf).unwrap();
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn xml_utf8_declaration_is_detected() {
        let buf = br#"<?xml version="1.0" encoding="utf-8"?><a/>"#;
        assert_eq!(detect(buf), EncodingLabel::Utf8Xml);
    }

    #[test]
    fn windows1251_text_is_transcoded_to_utf8() {
        // "Привет" in windows-1251.
        let cyrillic: Vec<u8> = vec![0xcf, 0xf0, 0xe8, 0xe2, 0xe5, 0xf2];
        let mut buf = cyrillic.repeat(20);
        buf.push(b'\n');
        assert_eq!(detect(&buf), EncodingLabel::WinDet);
        let (_, out) = convert_payload(&buf).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim_end(), "Привет".repeat(20));
    }

    #[test]
    fn speach_typo_is_fixed() {
        let out = normalize_text(b"<speach>hi</speach>\n");
        assert_eq!(out, b"<speech>hi</speech>\n");
    }

    #[test]
    fn blank_line_runs_collapse_to_fixed_point() {
        let out = normalize_text(b"a\n\n\n\n\nb\n");
        assert_eq!(out, b"a\n\nb\n");
    }

    #[test]
    fn crlf_is_normalized_to_lf() {
        let out = normalize_text(b"a\r\nb\r\n");
        assert_eq!(out, b"a\nb\n");
    }

    #[test]
    fn declared_windows1251_xml_without_high_bit_bytes_is_ascii() {
        // Declares windows-1251 but the body is plain ASCII, so total_8bit
        // is 0 and the detector returns ASCII before the winxml flag ever
        // gets a chance to force a WinDet classification: the declaration
        // alone is not sufficient without corroborating high-bit bytes.
        let buf = br#"<?xml version="1.0" encoding="windows-1251"?><a>plain</a>"#;
        assert_eq!(detect(buf), EncodingLabel::Ascii);
    }

    #[test]
    fn declared_windows1251_with_stray_0x98_byte_is_unknown() {
        // High-bit bytes are present, so the declaration alone would
        // normally confirm WinDet, but a stray 0x98 byte (outside the
        // windows-1251 code page) vetoes that and leaves it unclassified.
        let mut buf = br#"<?xml version="1.0" encoding="windows-1251"?><a>"#.to_vec();
        buf.extend(std::iter::repeat(0xcf).take(20));
        buf.push(0x98);
        buf.extend_from_slice(b"</a>");
        assert_eq!(detect(&buf), EncodingLabel::Unknown);
    }
}
