//! Remote printer directory client
//!
//! The directory is the printer list maintained in the back office. It is
//! fetched once at startup; any failure here is recoverable and leaves the
//! local catalog in place.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::error::{AgentError, AgentResult};
use crate::model::{Connection, ESCPOS, PrinterDefinition};

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("API request failed: {status} {body}")]
    Status { status: StatusCode, body: String },

    /// Body is not a JSON array
    #[error("Malformed printer list: {0}")]
    Malformed(String),

    /// No directory configured
    #[error("Printer directory disabled")]
    Disabled,
}

/// Printer record as published by the directory
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePrinter {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub connection: Option<Connection>,
}

impl RemotePrinter {
    /// Turn the record into a validated definition
    ///
    /// Records without a connection cannot be printed to and are rejected.
    pub fn into_definition(self) -> AgentResult<PrinterDefinition> {
        let connection = self.connection.ok_or_else(|| {
            AgentError::InvalidPrinter(format!("Printer {} has no connection", self.id))
        })?;
        let printer = PrinterDefinition {
            id: self.id,
            name: self.name,
            driver: self.driver.unwrap_or_else(|| ESCPOS.to_string()),
            connection,
        };
        printer.validate()?;
        Ok(printer)
    }
}

/// Source of the remote printer list
#[async_trait]
pub trait PrinterDirectory: Send + Sync {
    async fn fetch_printers(&self) -> Result<Vec<RemotePrinter>, DirectoryError>;
}

/// Directory served over HTTP: `GET {base}/printers`
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> String {
        format!("{}/printers", self.base_url)
    }
}

#[async_trait]
impl PrinterDirectory for HttpDirectory {
    #[instrument(skip(self), fields(url = %self.url()))]
    async fn fetch_printers(&self) -> Result<Vec<RemotePrinter>, DirectoryError> {
        let resp = self.client.get(self.url()).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectoryError::Status { status, body });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Malformed(e.to_string()))?;
        let serde_json::Value::Array(records) = body else {
            return Err(DirectoryError::Malformed("expected a JSON array".into()));
        };

        let total = records.len();
        let printers: Vec<RemotePrinter> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<RemotePrinter>(record) {
                Ok(printer) => Some(printer),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable printer record");
                    None
                }
            })
            .collect();

        info!(total, parsed = printers.len(), "Fetched printer directory");
        Ok(printers)
    }
}

/// Used when no directory URL is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDirectory;

#[async_trait]
impl PrinterDirectory for OfflineDirectory {
    async fn fetch_printers(&self) -> Result<Vec<RemotePrinter>, DirectoryError> {
        Err(DirectoryError::Disabled)
    }
}
