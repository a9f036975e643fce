//! Text encodings for thermal printers
//!
//! Receipt content is built as UTF-8 mixed with ESC/POS command bytes.
//! Before it goes on the wire the text runs are converted to whatever code
//! page the printer expects:
//! - UTF-8 printers get the buffer untouched
//! - GBK printers get Chinese mode switching (see [`convert_to_gbk`])
//! - Any other WHATWG label (e.g. `windows-1252`) is mapped through `encoding_rs`
//!
//! ASCII bytes (0x00-0x7F) are never touched so ESC/POS commands survive.

use crate::error::{PrintError, PrintResult};
use encoding_rs::Encoding;
use tracing::instrument;

/// Code page used for the text runs of a print job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Gbk,
    Legacy(&'static Encoding),
}

impl TextEncoding {
    /// Resolve an encoding label such as `utf8`, `gbk` or `cp1252`
    pub fn from_label(label: &str) -> PrintResult<Self> {
        let label = label.trim();
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| PrintError::InvalidConfig(format!("Unknown encoding: {}", label)))?;

        if encoding == encoding_rs::UTF_8 {
            return Ok(Self::Utf8);
        }
        if encoding == encoding_rs::GBK || encoding == encoding_rs::GB18030 {
            return Ok(Self::Gbk);
        }
        // UTF-16 and the replacement encoding cannot be produced by encoding_rs
        if encoding.output_encoding() != encoding {
            return Err(PrintError::InvalidConfig(format!(
                "Encoding not supported for printing: {}",
                label
            )));
        }
        Ok(Self::Legacy(encoding))
    }

    /// Canonical name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => encoding_rs::UTF_8.name(),
            Self::Gbk => encoding_rs::GBK.name(),
            Self::Legacy(encoding) => encoding.name(),
        }
    }

    /// Convert a mixed command/text buffer to this encoding
    pub fn encode(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Self::Utf8 => bytes.to_vec(),
            Self::Gbk => convert_to_gbk(bytes),
            Self::Legacy(encoding) => convert_mixed(bytes, *encoding),
        }
    }
}

/// Convert mixed UTF-8 content (with ESC/POS commands) to GBK
///
/// Only bytes >= 0x80 are treated as UTF-8 sequences and converted.
///
/// Also handles:
/// - Re-enabling Chinese mode after INIT command (ESC @)
/// - Euro symbol (€) special handling
#[instrument(skip(bytes))]
pub fn convert_to_gbk(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len() * 2);

    // FS & - enable Chinese mode, FS C 1 - select GBK code page
    result.extend_from_slice(&[0x1C, 0x26, 0x1C, 0x43, 0x01]);

    let mut buffer = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        // INIT (ESC @) resets the printer, Chinese mode has to be re-enabled after it
        if b == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == 0x40 {
            flush_gbk(&mut buffer, &mut result);
            result.extend_from_slice(&[0x1B, 0x40, 0x1C, 0x26]);
            i += 2;
            continue;
        }

        if b < 128 {
            flush_gbk(&mut buffer, &mut result);
            result.push(b);
        } else {
            buffer.push(b);
        }
        i += 1;
    }

    flush_gbk(&mut buffer, &mut result);

    // FS . - exit Chinese mode
    result.extend_from_slice(&[0x1C, 0x2E]);

    result
}

/// Convert mixed content to a single-byte or legacy multi-byte code page
fn convert_mixed(bytes: &[u8], encoding: &'static Encoding) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len());
    let mut buffer = Vec::new();

    for &b in bytes {
        if b < 128 {
            if !buffer.is_empty() {
                let s = String::from_utf8_lossy(&buffer);
                let (encoded, _, _) = encoding.encode(&s);
                result.extend_from_slice(&encoded);
                buffer.clear();
            }
            result.push(b);
        } else {
            buffer.push(b);
        }
    }

    if !buffer.is_empty() {
        let s = String::from_utf8_lossy(&buffer);
        let (encoded, _, _) = encoding.encode(&s);
        result.extend_from_slice(&encoded);
    }

    result
}

/// Flush the non-ASCII buffer, converting UTF-8 to GBK
fn flush_gbk(buffer: &mut Vec<u8>, result: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    let parts: Vec<&str> = s.split('€').collect();

    for (idx, part) in parts.iter().enumerate() {
        if !part.is_empty() {
            let (gbk, _, _) = encoding_rs::GBK.encode(part);
            result.extend_from_slice(&gbk);
        }
        if idx < parts.len() - 1 {
            // Exit Chinese -> PC858 -> Euro -> Enter Chinese
            result.extend_from_slice(&[0x1C, 0x2E, 0x1B, 0x74, 19, 0xD5, 0x1C, 0x26]);
        }
    }
    buffer.clear();
}
