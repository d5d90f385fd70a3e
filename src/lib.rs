//! # library_organizer
//!
//! Keeps a TV library directory in sync with one or more watch directories
//! where freshly downloaded episodes land. Every episode is hard linked into
//! a per-series directory named after the title in its filename.
//!
//! ## How it works
//!
//! - **Series names**: `Show.Name.S01E02.mkv` and `Show.Name.1x02.mkv` both
//!   map to the series `show name` ([`series`])
//! - **Events**: inotify create, delete, moved-to and moved-from events on each
//!   watch root are collapsed into created/deleted ([`watcher::source`])
//! - **Reconciliation**: a created episode is linked to
//!   `library/<series>/<basename>`; a deleted one is unlinked and the series
//!   directory goes away once it is empty ([`watcher::handler`])
//!
//! There is no index. The library tree on disk is the only state, and every
//! event is checked against it afresh.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use library_organizer::library::Library;
//! use library_organizer::watcher::{handler::LibraryReconciler, service::OrganizerService};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let library = Library::open("/data/media/tv")?;
//! let mut service = OrganizerService::new(LibraryReconciler::new(library));
//!
//! let roots = ["/data/media/seedbox", "/data/media/expanded"];
//! service.watch(&roots)?;
//! service.sync(&roots)?;
//! service.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Episode folders
//!
//! Some tools deliver an episode as `<name>/<name>.mkv`. A created folder is
//! treated as that payload file. If the folder shows up empty, it is watched
//! until the payload arrives.
//!
//! ## Error Handling
//!
//! Files that are not episodes are skipped, never errors. Filesystem failures
//! (permissions, cross-device links, a vanished library) come back as
//! [`OrganizerError`] and the daemon is expected to exit and be restarted.

pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod series;
pub mod watcher;

pub use error::{OrganizerError, OrganizerResult};
