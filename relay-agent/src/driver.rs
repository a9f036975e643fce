//! Device driver seam
//!
//! The print core only knows "render this payload on that printer" and
//! "is that printer reachable". [`EscPosDriver`] is the production backend
//! built on `relay-printer`; tests plug in their own.

use std::time::Duration;

use async_trait::async_trait;
use relay_printer::{
    Device, NetworkPrinter, PrintError, PrintResult, Printer, SerialPrinter, TextEncoding,
    UsbPrinter, raster_receipt_bytes, receipt_bytes,
};
use tracing::{debug, instrument};

use crate::model::{Connection, ESCPOS, PrinterDefinition};

/// Default raster width for image prints (58 mm paper at 203 dpi)
pub const DEFAULT_IMAGE_WIDTH: u32 = 384;

/// What to put on paper
#[derive(Debug, Clone)]
pub enum Payload {
    Text {
        lines: Vec<String>,
        encoding: TextEncoding,
    },
    /// GS v 0 raster data, already decoded and scaled
    Image { raster: Vec<u8> },
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
        }
    }
}

/// Renders payloads on physical printers
///
/// Each call opens the transport, does its work and closes it. Calls may
/// take arbitrarily long; the caller bounds them.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    async fn print(&self, printer: &PrinterDefinition, payload: &Payload) -> PrintResult<()>;

    /// Open and close the transport without printing
    async fn probe(&self, printer: &PrinterDefinition) -> PrintResult<()>;
}

/// ESC/POS over TCP, serial or USB
#[derive(Debug, Clone)]
pub struct EscPosDriver {
    open_timeout: Duration,
}

impl EscPosDriver {
    pub fn new(open_timeout: Duration) -> Self {
        Self { open_timeout }
    }

    /// Transport for a printer definition
    pub fn device_for(&self, printer: &PrinterDefinition) -> PrintResult<Device> {
        if printer.driver != ESCPOS {
            return Err(PrintError::Unsupported(format!(
                "Printer type {} is not supported",
                printer.driver
            )));
        }

        let device = match &printer.connection {
            Connection::Network { host, port } => {
                Device::Network(NetworkPrinter::new(host, *port)?.with_timeout(self.open_timeout))
            }
            Connection::Serial { path, options } => Device::Serial(
                SerialPrinter::new(path, options.clone())?.with_timeout(self.open_timeout),
            ),
            Connection::Usb {
                vendor_id,
                product_id,
            } => Device::Usb(UsbPrinter::new(*vendor_id, *product_id).with_timeout(self.open_timeout)),
        };
        Ok(device)
    }
}

fn render(payload: &Payload) -> Vec<u8> {
    match payload {
        Payload::Text { lines, encoding } => receipt_bytes(lines, *encoding),
        Payload::Image { raster } => raster_receipt_bytes(raster),
    }
}

#[async_trait]
impl DeviceDriver for EscPosDriver {
    #[instrument(skip(self, printer, payload), fields(printer_id = %printer.id, kind = payload.kind()))]
    async fn print(&self, printer: &PrinterDefinition, payload: &Payload) -> PrintResult<()> {
        let device = self.device_for(printer)?;
        let data = render(payload);
        debug!(target = %device.describe(), bytes = data.len(), "Sending print job");
        device.print(&data).await
    }

    #[instrument(skip(self, printer), fields(printer_id = %printer.id))]
    async fn probe(&self, printer: &PrinterDefinition) -> PrintResult<()> {
        let device = self.device_for(printer)?;
        device.probe().await
    }
}
