use crate::watcher::WatchError;
use crate::watcher::event::{EventKind, EventScope, FOLDER_MASK, FilesystemEvent, ROOT_MASK};
use inotify::{Event, EventMask, Inotify, WatchDescriptor};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EVENT_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone)]
struct WatchTarget {
    path: PathBuf,
    scope: EventScope,
}

/// One inotify subscription covering a set of watch roots.
///
/// Dropping the source closes the subscription.
#[derive(Debug)]
pub struct EventSource {
    inotify: Inotify,
    targets: HashMap<WatchDescriptor, WatchTarget>,
    buffer: Box<[u8]>,
}

impl EventSource {
    /// Opens a subscription and registers every root.
    ///
    /// Any failure here is fatal to the caller: there is no degraded mode
    /// without an event source.
    pub fn open<P: AsRef<Path>>(roots: &[P]) -> Result<Self, WatchError> {
        let inotify = Inotify::init().map_err(WatchError::Open)?;
        let mut source = Self {
            inotify,
            targets: HashMap::new(),
            buffer: vec![0; EVENT_BUFFER_SIZE].into_boxed_slice(),
        };

        for root in roots {
            source.add(root.as_ref(), EventScope::WatchRoot)?;
        }

        Ok(source)
    }

    /// Starts watching an episode folder for its payload to arrive.
    pub fn watch_folder(&mut self, folder: &Path) -> Result<(), WatchError> {
        if self.folder_descriptor(folder).is_some() {
            return Ok(());
        }
        debug!(path = %folder.display(), "Watching episode folder");
        self.add(folder, EventScope::EpisodeFolder)
    }

    /// Stops watching an episode folder. Unknown folders are ignored.
    pub fn unwatch_folder(&mut self, folder: &Path) {
        let Some(wd) = self.folder_descriptor(folder) else {
            return;
        };
        self.targets.remove(&wd);

        debug!(path = %folder.display(), "Ignoring episode folder");
        // The kernel drops the watch itself once the folder is gone.
        if let Err(e) = self.inotify.watches().remove(wd) {
            debug!(path = %folder.display(), error = %e, "Watch already released");
        }
    }

    pub fn is_watching_folder(&self, folder: &Path) -> bool {
        self.folder_descriptor(folder).is_some()
    }

    /// Returns everything queued right now without blocking.
    pub fn pending(&mut self) -> Result<Vec<FilesystemEvent>, WatchError> {
        let mut out = Vec::new();
        loop {
            let raw = match self.inotify.read_events(&mut self.buffer) {
                Ok(events) => events.map(RawEvent::from).collect::<Vec<_>>(),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(WatchError::Read(e)),
            };
            if raw.is_empty() {
                break;
            }
            self.normalize(raw, &mut out);
        }

        Ok(out)
    }

    /// Blocks until at least one event arrives, then returns the batch.
    ///
    /// The batch may be empty when only bookkeeping events were read.
    pub fn next_batch(&mut self) -> Result<Vec<FilesystemEvent>, WatchError> {
        let raw = self
            .inotify
            .read_events_blocking(&mut self.buffer)
            .map_err(WatchError::Read)?
            .map(RawEvent::from)
            .collect::<Vec<_>>();

        let mut out = Vec::new();
        self.normalize(raw, &mut out);
        Ok(out)
    }

    /// Closes the subscription.
    pub fn close(self) -> Result<(), WatchError> {
        self.inotify.close().map_err(WatchError::Read)
    }

    fn add(&mut self, path: &Path, scope: EventScope) -> Result<(), WatchError> {
        let mask = match scope {
            EventScope::WatchRoot => ROOT_MASK,
            EventScope::EpisodeFolder => FOLDER_MASK,
        };
        let wd = self
            .inotify
            .watches()
            .add(path, mask)
            .map_err(|source| WatchError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        self.targets.insert(
            wd,
            WatchTarget {
                path: path.to_path_buf(),
                scope,
            },
        );
        Ok(())
    }

    fn folder_descriptor(&self, folder: &Path) -> Option<WatchDescriptor> {
        self.targets
            .iter()
            .find(|(_, t)| t.scope == EventScope::EpisodeFolder && t.path == folder)
            .map(|(wd, _)| wd.clone())
    }

    fn normalize(&mut self, raw: Vec<RawEvent>, out: &mut Vec<FilesystemEvent>) {
        for event in raw {
            if event.mask.contains(EventMask::Q_OVERFLOW) {
                warn!("Event queue overflowed, some changes were missed");
                continue;
            }

            if event.mask.contains(EventMask::IGNORED) {
                if let Some(target) = self.targets.remove(&event.wd) {
                    debug!(path = %target.path.display(), "Watch removed");
                }
                continue;
            }

            let Some(target) = self.targets.get(&event.wd) else {
                debug!(mask = ?event.mask, "Event for unknown watch");
                continue;
            };
            let Some(kind) = EventKind::from_mask(event.mask) else {
                continue;
            };
            let Some(name) = event.name else {
                continue;
            };

            let normalized = FilesystemEvent {
                path: target.path.join(name),
                kind,
                is_dir: event.mask.contains(EventMask::ISDIR),
                scope: target.scope,
            };
            debug!(
                path = %normalized.path.display(),
                mask = ?event.mask,
                "on_event"
            );
            out.push(normalized);
        }
    }
}

/// Owned copy of an inotify event so the read buffer can be reused.
struct RawEvent {
    wd: WatchDescriptor,
    mask: EventMask,
    name: Option<PathBuf>,
}

impl From<Event<&OsStr>> for RawEvent {
    fn from(event: Event<&OsStr>) -> Self {
        Self {
            wd: event.wd,
            mask: event.mask,
            name: event.name.map(PathBuf::from),
        }
    }
}
