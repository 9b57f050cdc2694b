use std::{
    collections::HashMap,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use hidapi::HidError;
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, error::SendError},
    task::JoinHandle,
};

use crate::{
    constants::{BUFFER_SIZE, DEV_PATH, HIDRAW_PREFIX},
    watcher::{WatchEvent, Watcher},
};

use super::{
    registry::{DeviceFilter, Registry},
    source::{DeviceSource, HidSource},
};

/// Manager commands define all the different ways to interact with [Manager]
/// over a channel. Commands are processed one at a time by [Manager::run].
#[derive(Debug, Clone)]
pub enum Command {
    HidRawAdded { name: String },
    HidRawRemoved { name: String },
    InputReport { name: String, report: Vec<u8> },
    Stop,
}

/// Possible errors when starting the [Manager]
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("failed to initialize hidapi: {0}")]
    Hid(#[from] HidError),
    #[error("failed to watch for devices: {0}")]
    Watch(#[from] io::Error),
}

/// Possible errors for a manager client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("manager is no longer running")]
    ChannelClosed,
}

impl From<SendError<Command>> for ClientError {
    fn from(_: SendError<Command>) -> Self {
        Self::ChannelClosed
    }
}

/// A client for communicating with a running [Manager]
#[derive(Debug, Clone)]
pub struct ManagerClient {
    tx: mpsc::Sender<Command>,
}

impl ManagerClient {
    /// Ask the manager to stop. The manager releases all devices once it
    /// has left its event loop.
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.tx.send(Command::Stop).await?;
        Ok(())
    }
}

/// What woke up the event loop
enum Wakeup {
    Command(Command),
    Timer,
}

/// Manages connected controllers
///
/// The [Manager] watches for hidraw devices, opens the ones that match its
/// vendor and product id through its [DeviceSource] and hands them to its
/// [Registry], which keeps every controller updated until it is removed. All
/// device state is owned by the task running [Manager::run]; other tasks and
/// threads only talk to it through [Command] messages.
pub struct Manager {
    source: Box<dyn DeviceSource>,
    registry: Registry,
    dev_path: String,
    watcher: Option<Watcher>,
    watch_task: Option<JoinHandle<()>>,
    /// The manager keeps a sender of its own, so its receiver is only ever
    /// closed by [Manager::shutdown].
    tx: mpsc::Sender<Command>,
    rx: mpsc::Receiver<Command>,
    /// Stop flags of the input report readers, by device name
    readers: HashMap<String, Arc<AtomicBool>>,
}

impl Manager {
    /// Returns a new [Manager] for hidraw devices in /dev with the given
    /// vendor and product id. Fails if the HID subsystem cannot be opened or
    /// the device directory cannot be watched.
    pub fn new(vendor_id: u16, product_id: u16) -> Result<Self, ManagerError> {
        let source = HidSource::new(DEV_PATH)?;
        Self::with_source(
            DeviceFilter::new(vendor_id, product_id),
            Box::new(source),
            DEV_PATH,
        )
    }

    /// Returns a new [Manager] that watches `dev_path` for device nodes and
    /// opens them with the given [DeviceSource].
    pub fn with_source(
        filter: DeviceFilter,
        source: Box<dyn DeviceSource>,
        dev_path: &str,
    ) -> Result<Self, ManagerError> {
        let watcher = Watcher::new(dev_path)?;
        let (tx, rx) = mpsc::channel(BUFFER_SIZE);
        log::debug!(
            "Watching {dev_path} for devices {:04x}:{:04x}",
            filter.vendor_id,
            filter.product_id
        );

        Ok(Self {
            source,
            registry: Registry::new(filter),
            dev_path: dev_path.to_string(),
            watcher: Some(watcher),
            watch_task: None,
            tx,
            rx,
            readers: HashMap::new(),
        })
    }

    /// Returns a client that can be used to stop the manager
    pub fn client(&self) -> ManagerClient {
        ManagerClient {
            tx: self.tx.clone(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns true while the device directory is being watched
    pub fn watching(&self) -> bool {
        self.watch_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Start watching for devices and process [Command] messages and update
    /// timers until a [Command::Stop] is received. All devices and the
    /// directory watch are released before returning.
    pub async fn run(&mut self) -> Result<(), ManagerError> {
        self.watch_devices().await?;

        loop {
            let deadline = self.registry.next_deadline();
            let wakeup = tokio::select! {
                Some(cmd) = self.rx.recv() => Wakeup::Command(cmd),
                _ = wait_until(deadline) => Wakeup::Timer,
            };

            let cmd = match wakeup {
                Wakeup::Timer => {
                    self.registry.fire_timers(Instant::now(), unix_time());
                    continue;
                }
                Wakeup::Command(cmd) => cmd,
            };

            match cmd {
                Command::HidRawAdded { name } => self.on_hidraw_added(name),
                Command::HidRawRemoved { name } => self.on_hidraw_removed(name),
                Command::InputReport { name, report } => {
                    self.registry.on_input_report(&name, &report)
                }
                Command::Stop => {
                    log::debug!("Received stop command");
                    break;
                }
            }
        }

        self.shutdown();

        // Wait for the watch task to close its inotify handle
        if let Some(task) = self.watch_task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    log::warn!("Watch task for {} failed: {e}", self.dev_path);
                }
            }
        }
        log::debug!("Stopped watching {}", self.dev_path);

        Ok(())
    }

    /// Release every managed device, then stop listening for new ones
    pub fn shutdown(&mut self) {
        for (name, running) in self.readers.drain() {
            log::trace!("Stopping input report reader for {name}");
            running.store(false, Ordering::Relaxed);
        }
        self.registry.shutdown();
        self.watcher = None;
        if let Some(task) = self.watch_task.as_ref() {
            task.abort();
        }
        self.rx.close();
    }

    /// Called when a hidraw device (e.g. /dev/hidraw0) is added
    fn on_hidraw_added(&mut self, name: String) {
        log::debug!("HIDRaw added: {name}");
        if self.registry.contains(&name) {
            return;
        }

        let filter = self.registry.filter();
        let transport = match self.source.open(&name, &filter) {
            Ok(Some(transport)) => transport,
            Ok(None) => return,
            Err(e) => {
                log::error!("Unable to open {name}: {e}");
                return;
            }
        };
        if let Err(e) = self
            .registry
            .on_device_matched(&name, transport, Instant::now())
        {
            log::warn!("Unable to manage {name}: {e}");
            return;
        }

        self.start_reader(name);
    }

    /// Called when a hidraw device (e.g. /dev/hidraw0) is removed
    fn on_hidraw_removed(&mut self, name: String) {
        log::debug!("HIDRaw removed: {name}");
        if let Some(running) = self.readers.remove(&name) {
            running.store(false, Ordering::Relaxed);
        }
        self.registry.on_device_removed(&name);
    }

    /// Forward input reports from the given device to the event loop until
    /// the device is removed.
    fn start_reader(&mut self, name: String) {
        let running = Arc::new(AtomicBool::new(true));
        let result = self
            .source
            .start_reader(&name, self.tx.clone(), running.clone());
        if let Err(e) = result {
            log::warn!("Unable to read input reports from {name}: {e}");
            return;
        }
        self.readers.insert(name, running);
    }

    /// Starts watching for hidraw devices that are added and removed and
    /// performs an initial discovery of the devices already present.
    async fn watch_devices(&mut self) -> Result<(), ManagerError> {
        let Some(watcher) = self.watcher.take() else {
            return Ok(());
        };
        let (watcher_tx, mut watcher_rx) = mpsc::channel(BUFFER_SIZE);

        // Perform an initial hidraw device discovery
        let paths = std::fs::read_dir(&self.dev_path)?;
        for entry in paths {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Unable to read from directory: {e}");
                    continue;
                }
            };
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(HIDRAW_PREFIX) {
                continue;
            }
            log::debug!("Discovered hidraw device: {name}");
            let result = watcher_tx
                .send(WatchEvent::Create {
                    name,
                    base_path: self.dev_path.clone(),
                })
                .await;
            if let Err(e) = result {
                log::error!("Unable to send command: {e}");
            }
        }

        // Watch the directory and dispatch its events to the `run()` loop.
        // Aborting this task drops the watcher and its inotify handle.
        let cmd_tx = self.tx.clone();
        let dev_path = self.dev_path.clone();
        let watch = async move {
            if let Err(e) = watcher.watch(watcher_tx).await {
                log::error!("Failed to read inotify events: {e}");
            }
        };
        let dispatch = async move {
            log::debug!("Dispatching filesystem watch events");
            while let Some(event) = watcher_rx.recv().await {
                let cmd = match event {
                    WatchEvent::Create { name, base_path } if base_path == dev_path => {
                        if !name.starts_with(HIDRAW_PREFIX) {
                            continue;
                        }
                        Command::HidRawAdded { name }
                    }
                    WatchEvent::Delete { name, base_path } if base_path == dev_path => {
                        if !name.starts_with(HIDRAW_PREFIX) {
                            continue;
                        }
                        Command::HidRawRemoved { name }
                    }
                    _ => continue,
                };
                if cmd_tx.send(cmd).await.is_err() {
                    break;
                }
            }
            log::debug!("Stopped dispatching filesystem watch events");
        };
        self.watch_task = Some(tokio::spawn(async move {
            tokio::join!(watch, dispatch);
        }));

        Ok(())
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Resolves at the given deadline, or never if there is none
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

/// Returns the current time in seconds since the Unix epoch
fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
