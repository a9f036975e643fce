use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Connection, ESCPOS, PrinterDefinition};

pub const DEFAULT_API_BASE: &str = "https://admin.foodmonster.asia/api";

/// Agent configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | Preferences and logs |
/// | HTTP_PORT | 3900 | Local API port (bound to 127.0.0.1) |
/// | PRINTER_API_BASE | https://admin.foodmonster.asia/api | Printer directory base URL, empty disables it |
/// | DIRECTORY_TIMEOUT_MS | 10000 | Directory request timeout |
/// | ATTEMPT_TIMEOUT_MS | 10000 | Per-printer print attempt timeout |
/// | PROBE_TIMEOUT_MS | 3000 | Status probe timeout |
/// | CATALOG_FILE | (unset) | JSON catalog replacing the built-in printers/routes |
/// | LOG_LEVEL | info | Default log level (RUST_LOG wins) |
/// | LOG_JSON | false | JSON log lines (always on in production) |
/// | ENVIRONMENT | development | development / production |
///
/// ```ignore
/// WORK_DIR=/var/lib/relay HTTP_PORT=4000 relay-agent
/// ```
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub work_dir: PathBuf,
    pub http_port: u16,
    /// `None` when the directory is disabled
    pub api_base: Option<String>,
    pub directory_timeout_ms: u64,
    pub attempt_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub catalog_file: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
    pub environment: String,
}

impl AgentConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "./work_dir".into())
                .into(),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3900),
            api_base: match std::env::var("PRINTER_API_BASE") {
                Ok(base) if base.trim().is_empty() => None,
                Ok(base) => Some(base.trim().to_string()),
                Err(_) => Some(DEFAULT_API_BASE.to_string()),
            },
            directory_timeout_ms: std::env::var("DIRECTORY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000),
            attempt_timeout_ms: std::env::var("ATTEMPT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000),
            probe_timeout_ms: std::env::var("PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            catalog_file: std::env::var("CATALOG_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the work directory, used by tests
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    pub fn log_dir(&self) -> PathBuf {
        self.work_dir.join("logs")
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Catalog from `CATALOG_FILE`, or the built-in one
    pub fn load_catalog(&self) -> anyhow::Result<CatalogConfig> {
        match &self.catalog_file {
            Some(path) => CatalogConfig::from_file(path),
            None => Ok(CatalogConfig::default()),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Fallback printers and category routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(default)]
    pub printers: Vec<PrinterDefinition>,
    #[serde(default)]
    pub category_routes: HashMap<String, String>,
}

impl CatalogConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read catalog {}: {}", path.display(), e))?;
        let catalog: Self = serde_json::from_slice(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid catalog {}: {}", path.display(), e))?;
        for printer in &catalog.printers {
            printer.validate()?;
        }
        Ok(catalog)
    }
}

impl Default for CatalogConfig {
    /// Front counter on USB, kitchen on the LAN
    fn default() -> Self {
        Self {
            printers: vec![
                PrinterDefinition {
                    id: "front-usb".into(),
                    name: "Front Counter (USB)".into(),
                    driver: ESCPOS.into(),
                    connection: Connection::Usb {
                        vendor_id: 0x0416,
                        product_id: 0x5011,
                    },
                },
                PrinterDefinition {
                    id: "kitchen-lan".into(),
                    name: "Kitchen (Network)".into(),
                    driver: ESCPOS.into(),
                    connection: Connection::Network {
                        host: "192.168.1.50".into(),
                        port: 9100,
                    },
                },
            ],
            category_routes: HashMap::from([
                ("kitchen".to_string(), "kitchen-lan".to_string()),
                ("bar".to_string(), "front-usb".to_string()),
            ]),
        }
    }
}
