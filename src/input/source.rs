use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use hidapi::{HidApi, HidError};
use tokio::sync::mpsc;

use crate::drivers::dualshock4::driver::{Driver, InputReader};

use super::{manager::Command, registry::DeviceFilter, transport::Transport};

/// A [DeviceSource] opens the devices the [super::manager::Manager] is told
/// about and feeds their input reports back to it.
pub trait DeviceSource {
    /// Open the device node with the given name (e.g. "hidraw3"). Returns
    /// `Ok(None)` if the device does not pass the filter.
    fn open(
        &mut self,
        name: &str,
        filter: &DeviceFilter,
    ) -> Result<Option<Box<dyn Transport>>, Box<dyn Error + Send + Sync>>;

    /// Start forwarding input reports from the given device as
    /// [Command::InputReport] until `running` is cleared or the channel is
    /// closed.
    fn start_reader(
        &mut self,
        name: &str,
        tx: mpsc::Sender<Command>,
        running: Arc<AtomicBool>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Opens hidraw devices through hidapi
pub struct HidSource {
    api: HidApi,
    dev_path: String,
}

impl HidSource {
    /// Open the HID subsystem. Device names are resolved relative to
    /// `dev_path`.
    pub fn new(dev_path: &str) -> Result<Self, HidError> {
        let api = HidApi::new()?;
        Ok(Self {
            api,
            dev_path: dev_path.to_string(),
        })
    }

    fn path_of(&self, name: &str) -> String {
        format!("{}/{name}", self.dev_path)
    }
}

impl DeviceSource for HidSource {
    fn open(
        &mut self,
        name: &str,
        filter: &DeviceFilter,
    ) -> Result<Option<Box<dyn Transport>>, Box<dyn Error + Send + Sync>> {
        let path = self.path_of(name);
        self.api.refresh_devices()?;
        let ids = self
            .api
            .device_list()
            .find(|info| info.path().to_str() == Ok(path.as_str()))
            .map(|info| (info.vendor_id(), info.product_id()));
        let Some((vid, pid)) = ids else {
            log::debug!("No HID device found for {path}");
            return Ok(None);
        };
        if !filter.matches(vid, pid) {
            log::debug!("Ignoring {path} ({vid:04x}:{pid:04x})");
            return Ok(None);
        }

        let driver = Driver::new(&self.api, &path)?;
        log::info!("Found controller at {}", driver.path());
        Ok(Some(Box::new(driver)))
    }

    fn start_reader(
        &mut self,
        name: &str,
        tx: mpsc::Sender<Command>,
        running: Arc<AtomicBool>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut reader = InputReader::new(&self.api, &self.path_of(name))?;
        let name = name.to_string();

        // hidapi reads block, so each reader gets a blocking task
        tokio::task::spawn_blocking(move || {
            log::debug!("Started input report reader for {name}");
            while running.load(Ordering::Relaxed) {
                let report = match reader.poll() {
                    Ok(Some(report)) => report.to_vec(),
                    Ok(None) => continue,
                    Err(e) => {
                        log::debug!("Stopped reading input reports from {name}: {e}");
                        break;
                    }
                };
                let cmd = Command::InputReport {
                    name: name.clone(),
                    report,
                };
                if tx.blocking_send(cmd).is_err() {
                    break;
                }
            }
            log::debug!("Input report reader for {name} stopped");
        });

        Ok(())
    }
}
