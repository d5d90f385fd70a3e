//! Event-driven reconciliation of the library against the watch roots.
//!
//! - [`source`] wraps inotify and emits normalized [`event::FilesystemEvent`]s
//! - [`handler`] turns each event into link or unlink actions on the library
//! - [`service`] owns the subscription and drives the loop

pub mod event;
pub mod handler;
pub mod service;
pub mod source;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to open filesystem event source: {0}")]
    Open(#[source] std::io::Error),

    #[error("failed to watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read filesystem events: {0}")]
    Read(#[source] std::io::Error),
}
