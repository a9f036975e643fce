//! Printer definitions and the request/outcome shapes of the print API
//!
//! All JSON field names are camelCase, matching what the dashboard and the
//! remote printer directory exchange.

use relay_printer::{DEFAULT_NETWORK_PORT, SerialOptions};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

/// Driver kind every built-in printer speaks
pub const ESCPOS: &str = "escpos";

/// Bucket for bill items without a category
pub const DEFAULT_CATEGORY: &str = "default";

/// How to reach a printer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Connection {
    #[serde(rename_all = "camelCase")]
    Usb { vendor_id: u16, product_id: u16 },
    Network {
        host: String,
        #[serde(default = "default_port")]
        port: u16,
    },
    Serial {
        path: String,
        #[serde(default)]
        options: SerialOptions,
    },
}

fn default_port() -> u16 {
    DEFAULT_NETWORK_PORT
}

impl Connection {
    /// Required sub-fields present and usable
    pub fn validate(&self) -> AgentResult<()> {
        match self {
            Self::Usb {
                vendor_id,
                product_id,
            } => {
                if *vendor_id == 0 || *product_id == 0 {
                    return Err(AgentError::InvalidPrinter(
                        "USB printers need vendorId and productId".into(),
                    ));
                }
            }
            Self::Network { host, port } => {
                if host.trim().is_empty() {
                    return Err(AgentError::InvalidPrinter(
                        "Network printers need host/IP".into(),
                    ));
                }
                if *port == 0 {
                    return Err(AgentError::InvalidPrinter(format!(
                        "Invalid port for {}",
                        host
                    )));
                }
            }
            Self::Serial { path, options } => {
                if path.trim().is_empty() {
                    return Err(AgentError::InvalidPrinter(
                        "Serial printers need device path".into(),
                    ));
                }
                options
                    .validate()
                    .map_err(|e| AgentError::InvalidPrinter(e.to_string()))?;
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Usb { .. } => "usb",
            Self::Network { .. } => "network",
            Self::Serial { .. } => "serial",
        }
    }
}

/// A configured printer
///
/// Never mutated in place: replacing a printer means delete + add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterDefinition {
    pub id: String,
    pub name: String,
    /// Driver kind (payload family), e.g. `escpos`
    #[serde(rename = "type", default = "default_driver")]
    pub driver: String,
    pub connection: Connection,
}

fn default_driver() -> String {
    ESCPOS.to_string()
}

impl PrinterDefinition {
    /// Build and validate an ESC/POS printer
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        connection: Connection,
    ) -> AgentResult<Self> {
        let printer = Self {
            id: id.into(),
            name: name.into(),
            driver: default_driver(),
            connection,
        };
        printer.validate()?;
        Ok(printer)
    }

    pub fn usb(
        id: impl Into<String>,
        name: impl Into<String>,
        vendor_id: u16,
        product_id: u16,
    ) -> AgentResult<Self> {
        Self::new(
            id,
            name,
            Connection::Usb {
                vendor_id,
                product_id,
            },
        )
    }

    pub fn network(
        id: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> AgentResult<Self> {
        Self::new(
            id,
            name,
            Connection::Network {
                host: host.into(),
                port,
            },
        )
    }

    pub fn serial(
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        options: SerialOptions,
    ) -> AgentResult<Self> {
        Self::new(
            id,
            name,
            Connection::Serial {
                path: path.into(),
                options,
            },
        )
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.id.trim().is_empty() {
            return Err(AgentError::InvalidPrinter("Printer id is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(AgentError::InvalidPrinter(format!(
                "Printer name is required ({})",
                self.id
            )));
        }
        if self.driver.trim().is_empty() {
            return Err(AgentError::InvalidPrinter(format!(
                "Printer type is required ({})",
                self.id
            )));
        }
        self.connection.validate()
    }
}

/// Read-only view of the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterCatalog {
    pub printers: Vec<PrinterDefinition>,
    pub default_printer: Option<String>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRequest {
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub printer_id: Option<String>,
    /// Encoding label, `utf8` when absent
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Image as sent by callers: raw bytes, base64 text, or a base64 data URI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub image: ImageSource,
    #[serde(default)]
    pub printer_id: Option<String>,
    /// Maximum raster width in dots
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillItem {
    pub name: String,
    #[serde(default = "default_qty")]
    pub qty: u32,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_qty() -> u32 {
    1
}

impl BillItem {
    /// Category bucket this item is printed in
    pub fn bucket(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category,
            _ => DEFAULT_CATEGORY,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillRequest {
    #[serde(default)]
    pub items: Vec<BillItem>,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Which printer actually took the job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOutcome {
    pub printer_id: String,
}

/// Result for one category group of a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOutcome {
    pub category: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe result; probe failures are data, not errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterStatus {
    pub printer_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connections() {
        let usb: PrinterDefinition = serde_json::from_str(
            r#"{"id":"front-usb","name":"Front","connection":{"kind":"usb","vendorId":1046,"productId":20497}}"#,
        )
        .unwrap();
        assert_eq!(usb.driver, ESCPOS);
        assert_eq!(
            usb.connection,
            Connection::Usb {
                vendor_id: 0x0416,
                product_id: 0x5011
            }
        );

        let net: PrinterDefinition = serde_json::from_str(
            r#"{"id":"k","name":"Kitchen","type":"escpos","connection":{"kind":"network","host":"10.0.0.5"}}"#,
        )
        .unwrap();
        assert_eq!(
            net.connection,
            Connection::Network {
                host: "10.0.0.5".into(),
                port: 9100
            }
        );

        let serial: PrinterDefinition = serde_json::from_str(
            r#"{"id":"s","name":"Bar","connection":{"kind":"serial","path":"/dev/ttyUSB0","options":{"baudRate":38400}}}"#,
        )
        .unwrap();
        assert!(serial.validate().is_ok());
    }

    #[test]
    fn test_serialize_uses_type_and_kind() {
        let printer = PrinterDefinition::usb("front-usb", "Front", 0x0416, 0x5011).unwrap();
        let value = serde_json::to_value(&printer).unwrap();
        assert_eq!(value["type"], "escpos");
        assert_eq!(value["connection"]["kind"], "usb");
        assert_eq!(value["connection"]["vendorId"], 0x0416);
    }

    #[test]
    fn test_construction_validates_connection() {
        assert!(matches!(
            PrinterDefinition::usb("u", "USB", 0, 0x5011),
            Err(AgentError::InvalidPrinter(_))
        ));
        assert!(PrinterDefinition::network("n", "Net", "", 9100).is_err());
        assert!(PrinterDefinition::serial("s", "Serial", " ", SerialOptions::default()).is_err());
        assert!(PrinterDefinition::network("", "Net", "10.0.0.1", 9100).is_err());
        assert!(PrinterDefinition::network("n", "", "10.0.0.1", 9100).is_err());
    }

    #[test]
    fn test_bill_item_bucket() {
        let item: BillItem = serde_json::from_str(r#"{"name":"Napkins","qty":5}"#).unwrap();
        assert_eq!(item.bucket(), DEFAULT_CATEGORY);

        let item: BillItem =
            serde_json::from_str(r#"{"name":"Soup","category":""}"#).unwrap();
        assert_eq!(item.bucket(), DEFAULT_CATEGORY);
        assert_eq!(item.qty, 1);

        let item: BillItem =
            serde_json::from_str(r#"{"name":"Beer","qty":2,"category":"bar"}"#).unwrap();
        assert_eq!(item.bucket(), "bar");
    }

    #[test]
    fn test_image_source_untagged() {
        let req: ImageRequest = serde_json::from_str(r#"{"image":"aGk="}"#).unwrap();
        assert!(matches!(req.image, ImageSource::Text(_)));

        let req: ImageRequest = serde_json::from_str(r#"{"image":[1,2,3],"width":200}"#).unwrap();
        assert!(matches!(req.image, ImageSource::Bytes(ref b) if b == &[1, 2, 3]));
        assert_eq!(req.width, Some(200));
    }
}
