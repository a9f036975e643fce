#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use relay_agent::model::PrinterDefinition;
use relay_agent::{
    CategoryRouter, DeviceDriver, DirectoryError, FailoverExecutor, Payload, PreferenceStore,
    PrintService, PrinterDirectory, PrinterRegistry, RemotePrinter,
};
use relay_printer::{PrintError, PrintResult};
use tempfile::TempDir;

/// Records every call; printers listed in `failing` report offline
#[derive(Default)]
pub struct FakeDriver {
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    prints: Mutex<Vec<(String, Payload)>>,
    probes: Mutex<Vec<String>>,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn hang(&self, id: &str) {
        self.hanging.lock().unwrap().insert(id.to_string());
    }

    pub fn printed_on(&self) -> Vec<String> {
        self.prints.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn prints(&self) -> Vec<(String, Payload)> {
        self.prints.lock().unwrap().clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    fn is_failing(&self, id: &str) -> bool {
        self.failing.lock().unwrap().contains(id)
    }

    fn is_hanging(&self, id: &str) -> bool {
        self.hanging.lock().unwrap().contains(id)
    }
}

#[async_trait]
impl DeviceDriver for FakeDriver {
    async fn print(&self, printer: &PrinterDefinition, payload: &Payload) -> PrintResult<()> {
        self.prints
            .lock()
            .unwrap()
            .push((printer.id.clone(), payload.clone()));

        if self.is_hanging(&printer.id) {
            std::future::pending::<()>().await;
        }
        if self.is_failing(&printer.id) {
            return Err(PrintError::Offline(format!("{} is offline", printer.id)));
        }
        Ok(())
    }

    async fn probe(&self, printer: &PrinterDefinition) -> PrintResult<()> {
        self.probes.lock().unwrap().push(printer.id.clone());

        if self.is_hanging(&printer.id) {
            std::future::pending::<()>().await;
        }
        if self.is_failing(&printer.id) {
            return Err(PrintError::Offline(format!("{} is offline", printer.id)));
        }
        Ok(())
    }
}

/// Serves a fixed list, or fails
pub struct FakeDirectory {
    printers: Option<Vec<RemotePrinter>>,
}

impl FakeDirectory {
    pub fn with(printers: Vec<PrinterDefinition>) -> Self {
        Self {
            printers: Some(
                printers
                    .into_iter()
                    .map(|p| RemotePrinter {
                        id: p.id,
                        name: p.name,
                        driver: Some(p.driver),
                        connection: Some(p.connection),
                    })
                    .collect(),
            ),
        }
    }

    pub fn empty() -> Self {
        Self {
            printers: Some(Vec::new()),
        }
    }

    pub fn down() -> Self {
        Self { printers: None }
    }
}

#[async_trait]
impl PrinterDirectory for FakeDirectory {
    async fn fetch_printers(&self) -> Result<Vec<RemotePrinter>, DirectoryError> {
        self.printers.clone().ok_or(DirectoryError::Disabled)
    }
}

pub fn net(id: &str, name: &str) -> PrinterDefinition {
    PrinterDefinition::network(id, name, "10.0.0.9", 9100).unwrap()
}

pub fn usb(id: &str, name: &str) -> PrinterDefinition {
    PrinterDefinition::usb(id, name, 0x0416, 0x5011).unwrap()
}

/// front-usb + kitchen-lan, kitchen→kitchen-lan, bar→front-usb
pub fn builtin_printers() -> Vec<PrinterDefinition> {
    vec![
        usb("front-usb", "Front Counter (USB)"),
        net("kitchen-lan", "Kitchen (Network)"),
    ]
}

pub fn builtin_routes() -> HashMap<String, String> {
    HashMap::from([
        ("kitchen".to_string(), "kitchen-lan".to_string()),
        ("bar".to_string(), "front-usb".to_string()),
    ])
}

/// Solid black PNG as a `data:` URI
pub fn png_data_uri(width: u32, height: u32) -> String {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([0, 0, 0]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(&png))
}

pub struct Harness {
    pub service: Arc<PrintService>,
    pub driver: Arc<FakeDriver>,
    pub work_dir: Arc<TempDir>,
}

impl Harness {
    /// Service over `printers` with its preferences in a fresh temp dir
    pub fn new(printers: Vec<PrinterDefinition>) -> Self {
        Self::in_dir(Arc::new(TempDir::new().unwrap()), printers, FakeDriver::new())
    }

    pub fn builtin() -> Self {
        Self::new(builtin_printers())
    }

    /// Another "process" sharing the same work dir
    pub fn in_dir(
        work_dir: Arc<TempDir>,
        printers: Vec<PrinterDefinition>,
        driver: Arc<FakeDriver>,
    ) -> Self {
        let service = PrintService::new(
            PrinterRegistry::new(printers).unwrap(),
            PreferenceStore::new(work_dir.path()),
            CategoryRouter::new(builtin_routes()),
            FailoverExecutor::new(Duration::from_millis(200)),
            driver.clone(),
            Duration::from_millis(100),
        );

        Self {
            service: Arc::new(service),
            driver,
            work_dir,
        }
    }

    pub fn restart(&self, printers: Vec<PrinterDefinition>) -> Self {
        Self::in_dir(self.work_dir.clone(), printers, FakeDriver::new())
    }
}
