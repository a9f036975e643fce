//! Durable operator preferences (`printers.json`)
//!
//! The document is a flat JSON object. This module owns `defaultPrinterId`
//! and `customPrinters`; any other key is carried through untouched.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::model::PrinterDefinition;

pub const PREFERENCES_FILE: &str = "printers.json";

const KEY_DEFAULT_PRINTER: &str = "defaultPrinterId";
const KEY_CUSTOM_PRINTERS: &str = "customPrinters";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Preference file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Preference file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Typed view of the persisted preferences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub default_printer_id: Option<String>,
    pub custom_printers: Vec<PrinterDefinition>,
}

/// Fields to merge into the document; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct PreferencePatch {
    /// `Some(None)` writes an explicit null
    pub default_printer_id: Option<Option<String>>,
    pub custom_printers: Option<Vec<PrinterDefinition>>,
}

impl PreferencePatch {
    pub fn default_printer(id: Option<String>) -> Self {
        Self {
            default_printer_id: Some(id),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PreferenceStore {
    /// Store backed by `<work_dir>/printers.json`
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self::with_path(work_dir.as_ref().join(PREFERENCES_FILE))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last persisted preferences; empty when missing or unreadable
    pub async fn load(&self) -> Preferences {
        let doc = self.read_document().await;
        parse_preferences(&doc)
    }

    /// Merge `patch` into the document and write it back
    ///
    /// Failures are logged; the in-memory state the caller holds stays
    /// authoritative for this process.
    pub async fn save(&self, patch: PreferencePatch) {
        self.mutate(|doc| {
            if let Some(default) = patch.default_printer_id {
                doc.insert(
                    KEY_DEFAULT_PRINTER.to_string(),
                    default.map(Value::String).unwrap_or(Value::Null),
                );
            }
            if let Some(printers) = patch.custom_printers {
                put_custom_printers(doc, &printers);
            }
        })
        .await;
    }

    /// Read-modify-write of `customPrinters` under the write lock
    pub async fn update_custom_printers<F>(&self, update: F)
    where
        F: FnOnce(&mut Vec<PrinterDefinition>),
    {
        self.mutate(|doc| {
            let mut printers = parse_custom_printers(doc);
            update(&mut printers);
            put_custom_printers(doc, &printers);
        })
        .await;
    }

    async fn mutate<F>(&self, apply: F)
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.read_document().await;
        apply(&mut doc);

        if let Err(e) = self.write_document(&doc).await {
            error!(path = %self.path.display(), error = %e, "Failed to save printer preferences");
        }
    }

    async fn read_document(&self) -> Map<String, Value> {
        match self.try_read_document().await {
            Ok(doc) => doc,
            Err(PreferenceError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable printer preferences");
                Map::new()
            }
        }
    }

    async fn try_read_document(&self) -> Result<Map<String, Value>, PreferenceError> {
        let raw = tokio::fs::read(&self.path).await?;
        match serde_json::from_slice::<Value>(&raw)? {
            Value::Object(doc) => Ok(doc),
            other => {
                warn!(path = %self.path.display(), found = %json_kind(&other), "Printer preferences are not an object");
                Ok(Map::new())
            }
        }
    }

    /// Atomic: tmp file then rename, so a crash never leaves half a document
    async fn write_document(&self, doc: &Map<String, Value>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), "Printer preferences saved");
        Ok(())
    }
}

fn parse_preferences(doc: &Map<String, Value>) -> Preferences {
    let default_printer_id = doc
        .get(KEY_DEFAULT_PRINTER)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    Preferences {
        default_printer_id,
        custom_printers: parse_custom_printers(doc),
    }
}

fn parse_custom_printers(doc: &Map<String, Value>) -> Vec<PrinterDefinition> {
    let Some(Value::Array(records)) = doc.get(KEY_CUSTOM_PRINTERS) else {
        return Vec::new();
    };

    records
        .iter()
        .filter_map(
            |record| match serde_json::from_value::<PrinterDefinition>(record.clone()) {
                Ok(printer) => Some(printer),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable custom printer");
                    None
                }
            },
        )
        .collect()
}

fn put_custom_printers(doc: &mut Map<String, Value>, printers: &[PrinterDefinition]) {
    match serde_json::to_value(printers) {
        Ok(value) => {
            doc.insert(KEY_CUSTOM_PRINTERS.to_string(), value);
        }
        Err(e) => error!(error = %e, "Failed to serialize custom printers"),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
