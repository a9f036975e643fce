//! Printer adapters for sending ESC/POS data
//!
//! Supports:
//! - Network printers (raw TCP, port 9100)
//! - Serial printers (RS-232 / USB-serial adapters)
//! - USB printers bound to the Linux `usblp` driver (`/dev/usb/lpN`)

use crate::error::{PrintError, PrintResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

/// Default raw printing port
pub const DEFAULT_NETWORK_PORT: u16 = 9100;

const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for printer adapters
///
/// Every call opens the transport, does its work and closes it again;
/// adapters hold configuration only.
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Open and close the transport without sending anything
    async fn probe(&self) -> PrintResult<()>;
}

// ============================================================================
// Network
// ============================================================================

/// Network printer (raw TCP)
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer; `host` may be an IP or a hostname
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(PrintError::InvalidConfig("Network printers need host/IP".into()));
        }
        if port == 0 {
            return Err(PrintError::InvalidConfig(format!("Invalid port for {}", host)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            timeout: DEFAULT_OPEN_TIMEOUT,
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the printer address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> PrintResult<TcpStream> {
        tokio::time::timeout(self.timeout, TcpStream::connect((self.host.as_str(), self.port)))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr())))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr(), e)))
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let mut stream = self.connect().await?;
        debug!("Connected, sending {} bytes", data.len());

        stream.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;
        stream.flush().await?;
        let _ = stream.shutdown().await;

        info!("Print job sent");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr()))]
    async fn probe(&self) -> PrintResult<()> {
        let mut stream = self.connect().await.inspect_err(|e| {
            warn!(error = %e, "Printer offline");
        })?;
        let _ = stream.shutdown().await;
        debug!("Printer online");
        Ok(())
    }
}

// ============================================================================
// Serial
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialOptions {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: Parity::default(),
            stop_bits: default_stop_bits(),
        }
    }
}

impl SerialOptions {
    /// Check the settings map onto a real line configuration
    pub fn validate(&self) -> PrintResult<()> {
        self.to_data_bits()?;
        self.to_stop_bits()?;
        if self.baud_rate == 0 {
            return Err(PrintError::InvalidConfig("Baud rate must be positive".into()));
        }
        Ok(())
    }

    fn to_parity(&self) -> tokio_serial::Parity {
        match self.parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }

    fn to_stop_bits(&self) -> PrintResult<tokio_serial::StopBits> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            other => Err(PrintError::InvalidConfig(format!(
                "Invalid stop bits: {}",
                other
            ))),
        }
    }

    fn to_data_bits(&self) -> PrintResult<tokio_serial::DataBits> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            other => Err(PrintError::InvalidConfig(format!(
                "Invalid data bits: {}",
                other
            ))),
        }
    }
}

/// Serial printer
#[derive(Debug, Clone)]
pub struct SerialPrinter {
    path: String,
    options: SerialOptions,
    timeout: Duration,
}

impl SerialPrinter {
    pub fn new(path: &str, options: SerialOptions) -> PrintResult<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PrintError::InvalidConfig("Serial printers need device path".into()));
        }
        options.validate()?;

        Ok(Self {
            path: path.to_string(),
            options,
            timeout: DEFAULT_OPEN_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Opening a tty can block in the kernel, so it runs off the runtime threads
    async fn open(&self) -> PrintResult<tokio_serial::SerialStream> {
        use tokio_serial::SerialPortBuilderExt;

        // Windows wants \\.\COMn for reliable access to ports above COM9
        let port_name = if cfg!(target_os = "windows") && !self.path.starts_with(r"\\.\") {
            format!(r"\\.\{}", self.path)
        } else {
            self.path.clone()
        };

        let builder = tokio_serial::new(&port_name, self.options.baud_rate)
            .data_bits(self.options.to_data_bits()?)
            .parity(self.options.to_parity())
            .stop_bits(self.options.to_stop_bits()?)
            .timeout(self.timeout);
        let open = tokio::task::spawn_blocking(move || builder.open_native_async());

        tokio::time::timeout(self.timeout, open)
            .await
            .map_err(|_| PrintError::Timeout(format!("Open timeout: {}", self.path)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.path, e)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.path, e)))
    }
}

impl Printer for SerialPrinter {
    #[instrument(skip(self, data), fields(path = %self.path, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let mut port = self.open().await?;
        port.write_all(data).await?;
        port.flush().await?;

        info!("Print job sent");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path))]
    async fn probe(&self) -> PrintResult<()> {
        let port = self.open().await.inspect_err(|e| {
            warn!(error = %e, "Printer offline");
        })?;
        drop(port);
        Ok(())
    }
}

// ============================================================================
// USB
// ============================================================================

/// USB printer claimed by the kernel `usblp` driver
///
/// The device node is looked up by vendor/product id on every call, so a
/// printer that was re-plugged into another port is still found.
#[derive(Debug, Clone)]
pub struct UsbPrinter {
    vendor_id: u16,
    product_id: u16,
    class_root: PathBuf,
    dev_root: PathBuf,
    timeout: Duration,
}

impl UsbPrinter {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self::with_roots(vendor_id, product_id, "/sys/class/usbmisc", "/dev/usb")
    }

    /// Use custom sysfs class and device directories
    pub fn with_roots(
        vendor_id: u16,
        product_id: u16,
        class_root: impl Into<PathBuf>,
        dev_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vendor_id,
            product_id,
            class_root: class_root.into(),
            dev_root: dev_root.into(),
            timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `vvvv:pppp` in hex, the way lsusb prints it
    pub fn usb_id(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }

    /// Find the `/dev/usb/lpN` node for this vendor/product pair
    #[cfg(target_os = "linux")]
    pub async fn resolve_node(&self) -> PrintResult<PathBuf> {
        let mut entries = match tokio::fs::read_dir(&self.class_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PrintError::Offline(format!(
                    "USB printer {} not attached",
                    self.usb_id()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with("lp") {
                continue;
            }

            // class/lpN/device is the interface, its parent carries the ids
            let usb_device = entry.path().join("device").join("..");
            let vendor = read_hex_id(usb_device.join("idVendor")).await;
            let product = read_hex_id(usb_device.join("idProduct")).await;

            if vendor == Some(self.vendor_id) && product == Some(self.product_id) {
                let node = self.dev_root.join(name);
                debug!(node = %node.display(), "USB printer resolved");
                return Ok(node);
            }
        }

        Err(PrintError::Offline(format!(
            "USB printer {} not attached",
            self.usb_id()
        )))
    }

    #[cfg(not(target_os = "linux"))]
    pub async fn resolve_node(&self) -> PrintResult<PathBuf> {
        Err(PrintError::Unsupported(format!(
            "USB printing ({}) is only available on Linux",
            self.usb_id()
        )))
    }

    async fn open(&self) -> PrintResult<tokio::fs::File> {
        let node = self.resolve_node().await?;
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        let open = options.open(&node);

        tokio::time::timeout(self.timeout, open)
            .await
            .map_err(|_| PrintError::Timeout(format!("Open timeout: {}", node.display())))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", node.display(), e)))
    }
}

#[cfg(target_os = "linux")]
async fn read_hex_id(path: PathBuf) -> Option<u16> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    u16::from_str_radix(raw.trim(), 16).ok()
}

impl Printer for UsbPrinter {
    #[instrument(skip(self, data), fields(usb = %self.usb_id(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let mut file = self.open().await?;
        file.write_all(data).await?;
        file.flush().await?;

        info!("Print job sent");
        Ok(())
    }

    #[instrument(skip(self), fields(usb = %self.usb_id()))]
    async fn probe(&self) -> PrintResult<()> {
        let file = self.open().await.inspect_err(|e| {
            warn!(error = %e, "Printer offline");
        })?;
        drop(file);
        Ok(())
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Any supported transport
#[derive(Debug, Clone)]
pub enum Device {
    Network(NetworkPrinter),
    Serial(SerialPrinter),
    Usb(UsbPrinter),
}

impl Device {
    /// Short human readable target, used in logs
    pub fn describe(&self) -> String {
        match self {
            Self::Network(p) => format!("tcp://{}", p.addr()),
            Self::Serial(p) => format!("serial:{}", p.path()),
            Self::Usb(p) => format!("usb:{}", p.usb_id()),
        }
    }
}

impl Printer for Device {
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        match self {
            Self::Network(p) => p.print(data).await,
            Self::Serial(p) => p.print(data).await,
            Self::Usb(p) => p.print(data).await,
        }
    }

    async fn probe(&self) -> PrintResult<()> {
        match self {
            Self::Network(p) => p.probe().await,
            Self::Serial(p) => p.probe().await,
            Self::Usb(p) => p.probe().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.addr(), "192.168.1.100:9100");
    }

    #[test]
    fn test_network_printer_rejects_empty_host() {
        assert!(NetworkPrinter::new("  ", 9100).is_err());
        assert!(NetworkPrinter::new("printer.local", 0).is_err());
    }

    #[test]
    fn test_serial_options_defaults() {
        let options: SerialOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, SerialOptions::default());
        assert_eq!(options.baud_rate, 9600);

        let options: SerialOptions =
            serde_json::from_str(r#"{"baudRate":19200,"parity":"even"}"#).unwrap();
        assert_eq!(options.baud_rate, 19200);
        assert_eq!(options.parity, Parity::Even);
    }

    #[test]
    fn test_serial_options_validate() {
        let bad = SerialOptions {
            data_bits: 9,
            ..SerialOptions::default()
        };
        assert!(SerialPrinter::new("/dev/ttyUSB0", bad).is_err());
        assert!(SerialPrinter::new("", SerialOptions::default()).is_err());
    }

    #[tokio::test]
    async fn test_network_print_sends_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let printer = NetworkPrinter::new("127.0.0.1", port).unwrap();
        printer.print(b"\x1B\x40hello\n").await.unwrap();

        assert_eq!(server.await.unwrap(), b"\x1B\x40hello\n".to_vec());
    }

    #[tokio::test]
    async fn test_network_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let printer = NetworkPrinter::new("127.0.0.1", port)
            .unwrap()
            .with_timeout(Duration::from_millis(500));
        assert!(printer.probe().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_serial_missing_device() {
        let printer =
            SerialPrinter::new("/dev/does-not-exist-relay", SerialOptions::default()).unwrap();
        assert!(matches!(
            printer.probe().await,
            Err(PrintError::Connection(_))
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_usb_resolves_node_by_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let class_root = tmp.path().join("class");
        let dev_root = tmp.path().join("dev");

        // lp0/device/.. resolves back to lp0 in this fake tree
        for (name, vendor, product) in [("lp0", "04b8", "0e15"), ("lp1", "0416", "5011")] {
            let dir = class_root.join(name);
            std::fs::create_dir_all(dir.join("device")).unwrap();
            std::fs::write(dir.join("idVendor"), format!("{}\n", vendor)).unwrap();
            std::fs::write(dir.join("idProduct"), format!("{}\n", product)).unwrap();
        }
        std::fs::create_dir_all(&dev_root).unwrap();
        std::fs::write(dev_root.join("lp1"), b"").unwrap();

        let printer = UsbPrinter::with_roots(0x0416, 0x5011, &class_root, &dev_root);
        assert_eq!(printer.resolve_node().await.unwrap(), dev_root.join("lp1"));

        printer.print(b"receipt").await.unwrap();
        assert_eq!(std::fs::read(dev_root.join("lp1")).unwrap(), b"receipt".to_vec());

        let missing = UsbPrinter::with_roots(0x1234, 0x5678, &class_root, &dev_root);
        assert!(matches!(
            missing.probe().await,
            Err(PrintError::Offline(_))
        ));
    }
}
