use std::io;

use futures::StreamExt;
use inotify::{EventMask, Inotify, WatchMask};
use tokio::sync::mpsc::Sender;

#[derive(Debug, Clone)]
pub enum WatchEvent {
    Create { name: String, base_path: String },
    Delete { name: String, base_path: String },
}

/// Watches a directory for files being created or deleted
pub struct Watcher {
    inotify: Inotify,
    path: String,
}

impl Watcher {
    /// Start watching the given path. Fails if inotify is unavailable or the
    /// path cannot be watched. Events that happen before [Watcher::watch] is
    /// called are queued by the kernel.
    pub fn new(path: &str) -> io::Result<Self> {
        let inotify = Inotify::init()?;
        inotify
            .watches()
            .add(path, WatchMask::CREATE | WatchMask::DELETE)?;
        Ok(Self {
            inotify,
            path: path.to_string(),
        })
    }

    /// Send a [WatchEvent] to the given channel for every file created or
    /// deleted. Returns once the receiving side of the channel is closed or
    /// reading events fails. The inotify handle is closed when the returned
    /// future completes or is dropped.
    pub async fn watch(self, tx: Sender<WatchEvent>) -> io::Result<()> {
        let path = self.path;
        let mut events = self.inotify.into_event_stream([0u8; 4096])?;

        while let Some(event) = events.next().await {
            let event = event?;
            let Some(name) = event.name.and_then(|name| name.into_string().ok()) else {
                continue;
            };

            let value = if event.mask.contains(EventMask::CREATE) {
                log::debug!("inotify CREATE: {name}");
                WatchEvent::Create {
                    name,
                    base_path: path.clone(),
                }
            } else if event.mask.contains(EventMask::DELETE) {
                log::debug!("inotify DELETE: {name}");
                WatchEvent::Delete {
                    name,
                    base_path: path.clone(),
                }
            } else {
                log::trace!("inotify {:?}: {name}", event.mask);
                continue;
            };

            if let Err(e) = tx.send(value).await {
                log::debug!("Stopped watching {path}: {e}");
                break;
            }
        }

        Ok(())
    }
}
