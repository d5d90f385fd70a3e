use inotify::{EventMask, WatchMask};
use std::path::PathBuf;

/// Raw kinds registered on every watch root.
pub const ROOT_MASK: WatchMask = WatchMask::CREATE
    .union(WatchMask::DELETE)
    .union(WatchMask::MOVED_TO)
    .union(WatchMask::MOVED_FROM);

/// Raw kinds registered on an episode folder that is still waiting for its payload.
pub const FOLDER_MASK: WatchMask = WatchMask::CREATE.union(WatchMask::MOVED_TO);

/// Logical event kinds handed to the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Deleted,
}

impl EventKind {
    /// Collapses `create`/`moved-to` into [`EventKind::Created`] and
    /// `delete`/`moved-from` into [`EventKind::Deleted`].
    pub fn from_mask(mask: EventMask) -> Option<Self> {
        if mask.intersects(EventMask::CREATE | EventMask::MOVED_TO) {
            Some(EventKind::Created)
        } else if mask.intersects(EventMask::DELETE | EventMask::MOVED_FROM) {
            Some(EventKind::Deleted)
        } else {
            None
        }
    }
}

/// Which kind of watch produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    WatchRoot,
    EpisodeFolder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemEvent {
    pub path: PathBuf,
    pub kind: EventKind,
    pub is_dir: bool,
    pub scope: EventScope,
}

impl FilesystemEvent {
    pub fn created(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            kind: EventKind::Created,
            is_dir,
            scope: EventScope::WatchRoot,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            kind: EventKind::Deleted,
            is_dir,
            scope: EventScope::WatchRoot,
        }
    }
}
