//! Printer registry: the in-memory catalog and the default printer pointer
//!
//! Catalog order is significant, it is the failover order after the primary.
//! All mutations go through one write lock, so a catalog refresh is seen by
//! readers either entirely or not at all.

use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::directory::PrinterDirectory;
use crate::error::{AgentError, AgentResult};
use crate::model::{PrinterCatalog, PrinterDefinition};

#[derive(Debug, Default)]
struct RegistryState {
    printers: Vec<PrinterDefinition>,
    default_printer_id: Option<String>,
}

impl RegistryState {
    fn position(&self, id: &str) -> Option<usize> {
        self.printers.iter().position(|p| p.id == id)
    }

    fn catalog(&self) -> PrinterCatalog {
        PrinterCatalog {
            printers: self.printers.clone(),
            default_printer: self.default_printer_id.clone(),
        }
    }
}

/// Where the catalog came from after [`PrinterRegistry::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Remote list replaced the catalog
    Remote { count: usize },
    /// Remote list unavailable or empty, built-in catalog kept
    Fallback,
}

/// Result of [`PrinterRegistry::remove`]
#[derive(Debug, Clone)]
pub struct Removal {
    pub removed: PrinterDefinition,
    pub catalog: PrinterCatalog,
    /// Default pointer moved because the default printer was removed
    pub default_changed: bool,
}

#[derive(Debug)]
pub struct PrinterRegistry {
    state: RwLock<RegistryState>,
}

impl PrinterRegistry {
    /// Create a registry over the built-in catalog; the first printer is default
    pub fn new(printers: Vec<PrinterDefinition>) -> AgentResult<Self> {
        let mut seen = HashSet::new();
        for printer in &printers {
            printer.validate()?;
            if !seen.insert(printer.id.as_str()) {
                return Err(AgentError::AlreadyExists(printer.id.clone()));
            }
        }

        let default_printer_id = printers.first().map(|p| p.id.clone());
        Ok(Self {
            state: RwLock::new(RegistryState {
                printers,
                default_printer_id,
            }),
        })
    }

    /// Catalog and default, copied out
    pub async fn snapshot(&self) -> PrinterCatalog {
        self.state.read().await.catalog()
    }

    pub async fn get(&self, id: &str) -> Option<PrinterDefinition> {
        let state = self.state.read().await;
        state.printers.iter().find(|p| p.id == id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.position(id).is_some()
    }

    pub async fn default_printer_id(&self) -> Option<String> {
        self.state.read().await.default_printer_id.clone()
    }

    /// Replace the catalog with the remote directory's list
    ///
    /// Fetch errors and empty lists keep the current catalog.
    #[instrument(skip_all)]
    pub async fn load(&self, directory: &dyn PrinterDirectory) -> CatalogSource {
        let records = match directory.fetch_printers().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to load printers from directory, using local config");
                return CatalogSource::Fallback;
            }
        };

        let mut seen = HashSet::new();
        let mut printers = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            match record.into_definition() {
                Ok(printer) if seen.insert(printer.id.clone()) => printers.push(printer),
                Ok(_) => warn!(printer_id = %id, "Duplicate printer in directory, keeping first"),
                Err(e) => warn!(printer_id = %id, error = %e, "Skipping invalid printer from directory"),
            }
        }

        let count = printers.len();
        if self.replace_catalog(printers).await {
            info!(count, "Catalog replaced from directory");
            CatalogSource::Remote { count }
        } else {
            warn!("Directory returned no usable printers, using local config");
            CatalogSource::Fallback
        }
    }

    /// Swap the whole catalog in one step; the first entry becomes default
    ///
    /// Returns `false` (and changes nothing) for an empty list.
    pub async fn replace_catalog(&self, printers: Vec<PrinterDefinition>) -> bool {
        let Some(first) = printers.first() else {
            return false;
        };
        let default_printer_id = Some(first.id.clone());

        let mut state = self.state.write().await;
        state.printers = printers;
        state.default_printer_id = default_printer_id;
        true
    }

    /// Append an operator-defined printer
    pub async fn insert(&self, printer: PrinterDefinition) -> AgentResult<PrinterCatalog> {
        printer.validate()?;

        let mut state = self.state.write().await;
        if state.position(&printer.id).is_some() {
            return Err(AgentError::AlreadyExists(printer.id));
        }
        if state.default_printer_id.is_none() {
            state.default_printer_id = Some(printer.id.clone());
        }
        state.printers.push(printer);
        Ok(state.catalog())
    }

    /// Remove a printer, moving the default to the first remaining one if needed
    pub async fn remove(&self, id: &str) -> AgentResult<Removal> {
        let mut state = self.state.write().await;
        let index = state
            .position(id)
            .ok_or_else(|| AgentError::NotFound(id.to_string()))?;

        let removed = state.printers.remove(index);
        let default_changed = state.default_printer_id.as_deref() == Some(id);
        if default_changed {
            state.default_printer_id = state.printers.first().map(|p| p.id.clone());
        }

        Ok(Removal {
            removed,
            catalog: state.catalog(),
            default_changed,
        })
    }

    /// Point the default at `id`; unknown ids leave the default untouched
    pub async fn set_default(&self, id: &str) -> AgentResult<()> {
        let mut state = self.state.write().await;
        if state.position(id).is_none() {
            return Err(AgentError::NotFound(id.to_string()));
        }
        state.default_printer_id = Some(id.to_string());
        Ok(())
    }

    /// Adopt a persisted default if it exists in the current catalog
    ///
    /// Ids are matched by value only: a refreshed catalog that reuses an id
    /// for a different device will inherit the override.
    pub async fn apply_persisted_default(&self, id: &str) -> bool {
        self.set_default(id).await.is_ok()
    }

    /// Failover order for one print
    ///
    /// Primary is `preferred` when it resolves, otherwise the default; the
    /// rest of the catalog follows in registry order.
    pub async fn candidate_order(&self, preferred: Option<&str>) -> Vec<String> {
        let state = self.state.read().await;

        let primary = preferred
            .filter(|id| state.position(id).is_some())
            .map(str::to_string)
            .or_else(|| state.default_printer_id.clone());

        let Some(primary) = primary else {
            return Vec::new();
        };

        let mut order = Vec::with_capacity(state.printers.len());
        order.push(primary.clone());
        order.extend(
            state
                .printers
                .iter()
                .filter(|p| p.id != primary)
                .map(|p| p.id.clone()),
        );
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryError, RemotePrinter};
    use crate::model::Connection;
    use async_trait::async_trait;

    fn net(id: &str) -> PrinterDefinition {
        PrinterDefinition::network(id, id.to_uppercase(), "10.0.0.1", 9100).unwrap()
    }

    fn registry(ids: &[&str]) -> PrinterRegistry {
        PrinterRegistry::new(ids.iter().map(|id| net(id)).collect()).unwrap()
    }

    fn ids(catalog: &PrinterCatalog) -> Vec<&str> {
        catalog.printers.iter().map(|p| p.id.as_str()).collect()
    }

    struct StaticDirectory(Result<Vec<RemotePrinter>, ()>);

    #[async_trait]
    impl PrinterDirectory for StaticDirectory {
        async fn fetch_printers(&self) -> Result<Vec<RemotePrinter>, DirectoryError> {
            self.0.clone().map_err(|_| DirectoryError::Disabled)
        }
    }

    fn remote(id: &str, connection: Option<Connection>) -> RemotePrinter {
        RemotePrinter {
            id: id.to_string(),
            name: id.to_string(),
            driver: None,
            connection,
        }
    }

    fn lan(host: &str) -> Option<Connection> {
        Some(Connection::Network {
            host: host.to_string(),
            port: 9100,
        })
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = PrinterRegistry::new(vec![net("a"), net("a")]);
        assert!(matches!(result, Err(AgentError::AlreadyExists(id)) if id == "a"));
    }

    #[tokio::test]
    async fn test_first_printer_is_default() {
        let reg = registry(&["a", "b"]);
        assert_eq!(reg.default_printer_id().await.as_deref(), Some("a"));

        let empty = PrinterRegistry::new(Vec::new()).unwrap();
        assert_eq!(empty.default_printer_id().await, None);
    }

    #[tokio::test]
    async fn test_set_default_unknown_keeps_default() {
        let reg = registry(&["a", "b"]);
        assert!(matches!(
            reg.set_default("zzz").await,
            Err(AgentError::NotFound(_))
        ));
        assert_eq!(reg.default_printer_id().await.as_deref(), Some("a"));

        reg.set_default("b").await.unwrap();
        assert_eq!(reg.default_printer_id().await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_remove_default_moves_to_first() {
        let reg = registry(&["a", "b", "c"]);
        reg.set_default("b").await.unwrap();

        let removal = reg.remove("b").await.unwrap();
        assert!(removal.default_changed);
        assert_eq!(removal.catalog.default_printer.as_deref(), Some("a"));
        assert_eq!(ids(&removal.catalog), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_remove_non_default_keeps_default() {
        let reg = registry(&["a", "b", "c"]);
        reg.set_default("c").await.unwrap();

        let removal = reg.remove("a").await.unwrap();
        assert!(!removal.default_changed);
        assert_eq!(removal.catalog.default_printer.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_remove_last_clears_default() {
        let reg = registry(&["a"]);
        let removal = reg.remove("a").await.unwrap();
        assert!(removal.default_changed);
        assert_eq!(removal.catalog.default_printer, None);
        assert!(reg.candidate_order(None).await.is_empty());

        assert!(matches!(reg.remove("a").await, Err(AgentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert() {
        let reg = PrinterRegistry::new(Vec::new()).unwrap();
        let catalog = reg.insert(net("a")).await.unwrap();
        assert_eq!(catalog.default_printer.as_deref(), Some("a"));

        let catalog = reg.insert(net("b")).await.unwrap();
        assert_eq!(ids(&catalog), vec!["a", "b"]);
        assert_eq!(catalog.default_printer.as_deref(), Some("a"));

        assert!(matches!(
            reg.insert(net("b")).await,
            Err(AgentError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_candidate_order() {
        let reg = registry(&["a", "b", "c"]);
        assert_eq!(reg.candidate_order(None).await, vec!["a", "b", "c"]);
        assert_eq!(reg.candidate_order(Some("c")).await, vec!["c", "a", "b"]);
        // Unknown preference falls back to the default
        assert_eq!(reg.candidate_order(Some("gone")).await, vec!["a", "b", "c"]);

        reg.set_default("b").await.unwrap();
        assert_eq!(reg.candidate_order(None).await, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_load_replaces_catalog() {
        let reg = registry(&["a", "b"]);
        reg.set_default("b").await.unwrap();

        let directory = StaticDirectory(Ok(vec![
            remote("x", lan("10.0.0.8")),
            remote("y", None),
            remote("x", lan("10.0.0.9")),
            remote("z", lan("10.0.0.10")),
        ]));

        assert_eq!(reg.load(&directory).await, CatalogSource::Remote { count: 2 });
        let catalog = reg.snapshot().await;
        assert_eq!(ids(&catalog), vec!["x", "z"]);
        assert_eq!(catalog.default_printer.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_load_empty_or_failed_keeps_catalog() {
        let reg = registry(&["a", "b"]);
        reg.set_default("b").await.unwrap();
        let before = reg.snapshot().await;

        assert_eq!(
            reg.load(&StaticDirectory(Ok(Vec::new()))).await,
            CatalogSource::Fallback
        );
        assert_eq!(reg.snapshot().await, before);

        assert_eq!(
            reg.load(&StaticDirectory(Ok(vec![remote("y", None)]))).await,
            CatalogSource::Fallback
        );
        assert_eq!(reg.snapshot().await, before);

        assert_eq!(reg.load(&StaticDirectory(Err(()))).await, CatalogSource::Fallback);
        assert_eq!(reg.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_persisted_default_only_when_resolvable() {
        let reg = registry(&["a", "b"]);
        assert!(reg.apply_persisted_default("b").await);
        assert_eq!(reg.default_printer_id().await.as_deref(), Some("b"));

        assert!(!reg.apply_persisted_default("gone").await);
        assert_eq!(reg.default_printer_id().await.as_deref(), Some("b"));
    }
}
