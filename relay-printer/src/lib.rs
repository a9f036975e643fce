//! # relay-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - Code page conversion (UTF-8, GBK, legacy single-byte pages)
//! - Raster images (GS v 0)
//! - Transports: network (TCP 9100), serial, USB (`usblp` device nodes)
//!
//! WHICH printer gets a job, and what happens when it is down, is decided
//! by `relay-agent`.
//!
//! ## Example
//!
//! ```ignore
//! use relay_printer::{receipt_bytes, NetworkPrinter, Printer, TextEncoding};
//!
//! let data = receipt_bytes(&["Table 12".to_string(), "2 x Beer".to_string()], TextEncoding::Utf8);
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100)?;
//! printer.print(&data).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;

// Re-exports
pub use encoding::{TextEncoding, convert_to_gbk};
pub use error::{PrintError, PrintResult};
pub use escpos::{
    EscPosBuilder, MAX_RASTER_WIDTH, raster_image, raster_receipt_bytes, receipt_bytes,
};
pub use printer::{
    DEFAULT_NETWORK_PORT, Device, NetworkPrinter, Parity, Printer, SerialOptions, SerialPrinter,
    UsbPrinter,
};
