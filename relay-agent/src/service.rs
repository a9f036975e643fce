//! Print orchestration
//!
//! `PrintService` is what callers talk to. It resolves which printers to try
//! (registry + category routes + persisted overrides), hands the attempts to
//! the failover executor, and keeps the preference file in step with every
//! operator change.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use relay_printer::{PrintError, TextEncoding, raster_image};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::audit_log;
use crate::config::{AgentConfig, CatalogConfig};
use crate::directory::PrinterDirectory;
use crate::driver::{DEFAULT_IMAGE_WIDTH, DeviceDriver, Payload};
use crate::error::{AgentError, AgentResult};
use crate::failover::FailoverExecutor;
use crate::model::{
    BillItem, BillRequest, CategoryOutcome, ImageRequest, ImageSource, PrintOutcome,
    PrinterCatalog, PrinterDefinition, PrinterStatus, ReceiptRequest,
};
use crate::preferences::{PreferencePatch, PreferenceStore};
use crate::registry::{CatalogSource, PrinterRegistry};
use crate::router::CategoryRouter;

const DEFAULT_ENCODING: &str = "utf8";
const BILL_RULE: &str = "--------------------";

/// Why one candidate did not take the job
#[derive(Debug, Error)]
enum AttemptError {
    /// Removed between building the candidate list and the attempt
    #[error("Printer {0} does not exist")]
    Missing(String),

    #[error(transparent)]
    Device(#[from] PrintError),
}

pub struct PrintService {
    registry: PrinterRegistry,
    preferences: PreferenceStore,
    router: CategoryRouter,
    executor: FailoverExecutor,
    driver: Arc<dyn DeviceDriver>,
    probe_timeout: Duration,
    /// Held across a registry change and its preference write
    operator_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for PrintService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintService")
            .field("registry", &self.registry)
            .field("preferences", &self.preferences.path())
            .field("router", &self.router)
            .field("executor", &self.executor)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

impl PrintService {
    pub fn new(
        registry: PrinterRegistry,
        preferences: PreferenceStore,
        router: CategoryRouter,
        executor: FailoverExecutor,
        driver: Arc<dyn DeviceDriver>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            preferences,
            router,
            executor,
            driver,
            probe_timeout,
            operator_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Wire the service from configuration
    pub fn from_config(
        config: &AgentConfig,
        catalog: CatalogConfig,
        driver: Arc<dyn DeviceDriver>,
    ) -> AgentResult<Self> {
        let registry = PrinterRegistry::new(catalog.printers)?;
        Ok(Self::new(
            registry,
            PreferenceStore::new(&config.work_dir),
            CategoryRouter::new(catalog.category_routes),
            FailoverExecutor::new(config.attempt_timeout()),
            driver,
            config.probe_timeout(),
        ))
    }

    pub fn registry(&self) -> &PrinterRegistry {
        &self.registry
    }

    /// Bring the catalog up to date before serving requests
    ///
    /// Order: remote directory (or the built-in catalog), then operator
    /// printers from preferences, then the persisted default.
    #[instrument(skip_all)]
    pub async fn initialize(&self, directory: &dyn PrinterDirectory) -> CatalogSource {
        let source = self.registry.load(directory).await;
        let prefs = self.preferences.load().await;

        for printer in prefs.custom_printers {
            if self.registry.contains(&printer.id).await {
                debug!(printer_id = %printer.id, "Custom printer already in catalog");
                continue;
            }
            let id = printer.id.clone();
            if let Err(e) = self.registry.insert(printer).await {
                warn!(printer_id = %id, error = %e, "Skipping stored custom printer");
            }
        }

        if let Some(id) = prefs.default_printer_id
            && !self.registry.apply_persisted_default(&id).await
        {
            warn!(printer_id = %id, "Stored default printer no longer exists");
        }

        let catalog = self.registry.snapshot().await;
        info!(
            printers = catalog.printers.len(),
            default = ?catalog.default_printer,
            ?source,
            "Printer catalog ready"
        );
        source
    }

    // ========================================================================
    // Catalog management
    // ========================================================================

    pub async fn list_printers(&self) -> PrinterCatalog {
        self.registry.snapshot().await
    }

    pub async fn add_printer(&self, printer: PrinterDefinition) -> AgentResult<PrinterCatalog> {
        let _guard = self.operator_lock.lock().await;
        let catalog = self.registry.insert(printer.clone()).await?;

        let resource = format!("printer:{}", printer.id);
        let details = format!("{} ({})", printer.name, printer.connection.kind());
        self.preferences
            .update_custom_printers(move |list| {
                list.retain(|p| p.id != printer.id);
                list.push(printer);
            })
            .await;

        audit_log!("add_printer", resource, details);
        Ok(catalog)
    }

    pub async fn set_default_printer(&self, id: &str) -> AgentResult<PrinterCatalog> {
        let _guard = self.operator_lock.lock().await;
        self.registry.set_default(id).await?;
        self.preferences
            .save(PreferencePatch::default_printer(Some(id.to_string())))
            .await;

        audit_log!("set_default_printer", format!("printer:{}", id));
        Ok(self.registry.snapshot().await)
    }

    pub async fn delete_printer(&self, id: &str) -> AgentResult<PrinterCatalog> {
        let _guard = self.operator_lock.lock().await;
        let removal = self.registry.remove(id).await?;

        self.preferences
            .update_custom_printers(|list| list.retain(|p| p.id != id))
            .await;
        if removal.default_changed {
            self.preferences
                .save(PreferencePatch::default_printer(
                    removal.catalog.default_printer.clone(),
                ))
                .await;
        }

        audit_log!(
            "delete_printer",
            format!("printer:{}", id),
            format!("default now {:?}", removal.catalog.default_printer)
        );
        Ok(removal.catalog)
    }

    // ========================================================================
    // Printing
    // ========================================================================

    #[instrument(skip_all, fields(lines = request.lines.len(), printer_id = ?request.printer_id))]
    pub async fn print_receipt(&self, request: ReceiptRequest) -> AgentResult<PrintOutcome> {
        let label = request.encoding.as_deref().unwrap_or(DEFAULT_ENCODING);
        let encoding =
            TextEncoding::from_label(label).map_err(|e| AgentError::InvalidPayload(e.to_string()))?;

        let payload = Payload::Text {
            lines: request.lines,
            encoding,
        };
        self.print_payload(request.printer_id.as_deref(), &payload).await
    }

    #[instrument(skip_all, fields(printer_id = ?request.printer_id))]
    pub async fn print_image(&self, request: ImageRequest) -> AgentResult<PrintOutcome> {
        let data = decode_image(request.image)?;
        let width = request.width.unwrap_or(DEFAULT_IMAGE_WIDTH);
        if width == 0 {
            return Err(AgentError::InvalidPayload("Image width must be positive".into()));
        }

        // Decoded once, before any printer is tried
        let raster =
            raster_image(&data, width).map_err(|e| AgentError::InvalidPayload(e.to_string()))?;

        let payload = Payload::Image { raster };
        self.print_payload(request.printer_id.as_deref(), &payload).await
    }

    /// Print one ticket per category, each routed independently
    ///
    /// A failing category never stops the others; every group gets an outcome.
    #[instrument(skip_all, fields(items = request.items.len()))]
    pub async fn print_bill_by_category(&self, request: BillRequest) -> Vec<CategoryOutcome> {
        let mut outcomes = Vec::new();

        for (category, items) in group_by_category(&request.items) {
            let printer_id = self.router.resolve(category).map(str::to_string);
            let receipt = ReceiptRequest {
                lines: bill_lines(category, &items),
                printer_id,
                encoding: None,
            };

            let outcome = match self.print_receipt(receipt).await {
                Ok(PrintOutcome { printer_id }) => CategoryOutcome {
                    category: category.to_string(),
                    ok: true,
                    printer_id: Some(printer_id),
                    error: None,
                },
                Err(e) => {
                    warn!(category, error = %e, "Category ticket failed");
                    CategoryOutcome {
                        category: category.to_string(),
                        ok: false,
                        printer_id: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Single probe of one printer; an unreachable printer is a result, not an error
    #[instrument(skip(self))]
    pub async fn check_status(&self, id: &str) -> AgentResult<PrinterStatus> {
        let printer = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| AgentError::NotFound(id.to_string()))?;

        let error = match tokio::time::timeout(self.probe_timeout, self.driver.probe(&printer)).await
        {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "Probe timed out after {} ms",
                self.probe_timeout.as_millis()
            )),
        };

        Ok(PrinterStatus {
            printer_id: printer.id,
            ok: error.is_none(),
            error,
        })
    }

    async fn print_payload(
        &self,
        preferred: Option<&str>,
        payload: &Payload,
    ) -> AgentResult<PrintOutcome> {
        let candidates = self.registry.candidate_order(preferred).await;
        let registry = &self.registry;
        let driver = &self.driver;

        let succeeded = self
            .executor
            .execute(&candidates, move |id| async move {
                let printer = registry
                    .get(&id)
                    .await
                    .ok_or_else(|| AttemptError::Missing(id.clone()))?;
                driver.print(&printer, payload).await?;
                Ok::<_, AttemptError>(())
            })
            .await?;

        Ok(PrintOutcome {
            printer_id: succeeded.printer_id,
        })
    }
}

/// Raw bytes pass through; text is base64, optionally as a data URI
fn decode_image(source: ImageSource) -> AgentResult<Vec<u8>> {
    let data = match source {
        ImageSource::Bytes(bytes) => bytes,
        ImageSource::Text(text) => {
            let encoded = match text.split_once(',') {
                Some((header, body)) if header.starts_with("data:") => body,
                _ => text.as_str(),
            };
            let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map_err(|e| AgentError::InvalidPayload(format!("Invalid base64 image: {}", e)))?
        }
    };

    if data.is_empty() {
        return Err(AgentError::InvalidPayload("Image is empty".into()));
    }
    Ok(data)
}

/// Groups in first-seen order
fn group_by_category(items: &[BillItem]) -> Vec<(&str, Vec<&BillItem>)> {
    let mut groups: Vec<(&str, Vec<&BillItem>)> = Vec::new();
    for item in items {
        let bucket = item.bucket();
        match groups.iter_mut().find(|(category, _)| *category == bucket) {
            Some((_, group)) => group.push(item),
            None => groups.push((bucket, vec![item])),
        }
    }
    groups
}

fn bill_lines(category: &str, items: &[&BillItem]) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() + 3);
    lines.push(format!("Category: {}", category));
    lines.push(BILL_RULE.to_string());
    lines.extend(items.iter().map(|item| format!("{} x {}", item.qty, item.name)));
    lines.push(" ".to_string());
    lines
}
