//! # relay-agent
//!
//! Keeps the shop's receipt printers reachable and decides where each print
//! goes.
//!
//! ```text
//! request ─► PrintService ─► candidate order (registry + routes + preferences)
//!                         └► FailoverExecutor ─► DeviceDriver, one printer at a time
//! ```
//!
//! - [`registry`] - printer catalog and default pointer
//! - [`preferences`] - `printers.json` (default printer, operator printers)
//! - [`router`] - category → printer routes for split bills
//! - [`failover`] - sequential attempts with per-attempt timeouts
//! - [`service`] - the operations callers use
//! - [`directory`] - remote printer list
//! - [`driver`] - device driver seam, ESC/POS backend
//! - [`api`] - local HTTP API

pub mod api;
pub mod config;
pub mod directory;
pub mod driver;
pub mod error;
pub mod failover;
pub mod logger;
pub mod model;
pub mod preferences;
pub mod registry;
pub mod router;
pub mod server;
pub mod service;

pub use config::{AgentConfig, CatalogConfig};
pub use directory::{DirectoryError, HttpDirectory, OfflineDirectory, PrinterDirectory, RemotePrinter};
pub use driver::{DeviceDriver, EscPosDriver, Payload};
pub use error::{AgentError, AgentResult};
pub use failover::{AttemptFailure, FailoverError, FailoverExecutor};
pub use logger::{cleanup_old_logs, init_logger, init_logger_with_file};
pub use preferences::{PreferencePatch, PreferenceStore, Preferences};
pub use registry::{CatalogSource, PrinterRegistry};
pub use router::CategoryRouter;
pub use service::PrintService;
