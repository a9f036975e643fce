//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::encoding::TextEncoding;
use crate::error::PrintResult;
use tracing::instrument;

/// Widest raster the common 80mm heads accept (dots)
pub const MAX_RASTER_WIDTH: u32 = 576;

/// ESC/POS command builder
///
/// Text is accumulated as UTF-8 and converted to the printer's code page
/// in [`EscPosBuilder::build`].
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(4096);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self { buf }
    }

    // === Text Output ===

    /// Write raw text
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    /// Align to center
    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    /// Align to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Paper Control ===

    /// Full cut after feeding n lines (GS V 66 n)
    ///
    /// Lets the printer manage the cutter-to-head distance, which wastes
    /// less paper than a separate feed + cut.
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, lines]);
        self
    }

    // === Raw Commands ===

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Build ===

    /// Build the final byte buffer, converting text runs to `encoding`
    pub fn build(self, encoding: TextEncoding) -> Vec<u8> {
        encoding.encode(&self.buf)
    }

    /// Build without conversion (raster data or ASCII-only content)
    pub fn build_raw(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a list of text lines as a receipt, ending with a cut
pub fn receipt_bytes(lines: &[String], encoding: TextEncoding) -> Vec<u8> {
    let mut builder = EscPosBuilder::new();
    builder.left();
    for line in lines {
        builder.line(line);
    }
    builder.cut_feed(4);
    builder.build(encoding)
}

/// Center raster data from [`raster_image`] on the paper, ending with a cut
pub fn raster_receipt_bytes(raster: &[u8]) -> Vec<u8> {
    let mut builder = EscPosBuilder::new();
    builder.center().raw(raster).left().cut_feed(4);
    builder.build_raw()
}

// ============================================================================
// Image Processing
// ============================================================================

/// Decode an image and return ESC/POS raster data
///
/// The image will be:
/// - Resized to fit `max_width` dots (clamped to [`MAX_RASTER_WIDTH`])
/// - Converted to 1-bit monochrome
/// - Encoded as GS v 0 raster graphics
#[cfg(feature = "image")]
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn raster_image(data: &[u8], max_width: u32) -> PrintResult<Vec<u8>> {
    use crate::error::PrintError;
    use image::GenericImageView;
    use tracing::debug;

    let img = image::load_from_memory(data).map_err(|e| PrintError::Image(e.to_string()))?;
    let (w, h) = img.dimensions();
    debug!(width = w, height = h, "image decoded");

    let max_width = max_width.clamp(8, MAX_RASTER_WIDTH);
    let (new_w, new_h) = if w > max_width {
        let ratio = max_width as f64 / w as f64;
        (max_width, ((h as f64 * ratio) as u32).max(1))
    } else {
        (w, h)
    };

    if new_h > 0xFFFF {
        return Err(PrintError::Image(format!("Image too tall: {} dots", new_h)));
    }

    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Nearest);

    let x_bytes = new_w.div_ceil(8);

    let mut out = Vec::with_capacity(8 + (x_bytes * new_h) as usize + 1);

    // GS v 0 m xL xH yL yH
    out.extend_from_slice(&[0x1D, 0x76, 0x30, 0x00]);
    out.push(x_bytes as u8);
    out.push((x_bytes >> 8) as u8);
    out.push(new_h as u8);
    out.push((new_h >> 8) as u8);

    // RGBA so transparent pixels come out white
    let rgba = resized.to_rgba8();

    for y in 0..new_h {
        for x_byte in 0..x_bytes {
            let mut byte = 0u8;
            for bit in 0..8 {
                let x = x_byte * 8 + bit;
                if x < new_w {
                    let pixel = rgba.get_pixel(x, y);
                    if pixel[3] >= 128 {
                        let luma = (0.299 * pixel[0] as f32
                            + 0.587 * pixel[1] as f32
                            + 0.114 * pixel[2] as f32) as u8;
                        if luma < 128 {
                            byte |= 1 << (7 - bit);
                        }
                    }
                }
            }
            out.push(byte);
        }
    }

    out.push(0x0A);

    Ok(out)
}

#[cfg(not(feature = "image"))]
#[instrument(skip(_data))]
pub fn raster_image(_data: &[u8], _max_width: u32) -> PrintResult<Vec<u8>> {
    Err(crate::error::PrintError::Unsupported(
        "built without image support".to_string(),
    ))
}
