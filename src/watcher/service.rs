use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    error::OrganizerResult,
    watcher::{
        WatchError,
        event::{EventKind, EventScope, FilesystemEvent},
        handler::{LibraryReconciler, Outcome, SkipReason},
        source::EventSource,
    },
};

/// Single-consumer loop tying the event source to the reconciler.
///
/// At most one subscription is active. Events are handled strictly in the
/// order they are read, one at a time, and every filesystem call happens
/// inline. Callers must not call [`watch`](Self::watch) while a
/// [`pump`](Self::pump) or [`run`](Self::run) is in progress.
#[derive(Debug)]
pub struct OrganizerService {
    reconciler: LibraryReconciler,
    source: Option<EventSource>,
    roots: Vec<PathBuf>,
}

impl OrganizerService {
    pub fn new(reconciler: LibraryReconciler) -> Self {
        OrganizerService {
            reconciler,
            source: None,
            roots: Vec::new(),
        }
    }

    pub fn reconciler(&self) -> &LibraryReconciler {
        &self.reconciler
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_watching(&self) -> bool {
        self.source.is_some()
    }

    /// Whether `folder` is still watched for its payload to arrive.
    pub fn is_awaiting_payload(&self, folder: &Path) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.is_watching_folder(folder))
    }

    /// Subscribes to `roots`, closing any previous subscription first.
    ///
    /// # Errors
    /// Fails if inotify cannot be initialized or a root cannot be watched.
    /// The previous subscription is already closed at that point.
    pub fn watch<P: AsRef<Path>>(&mut self, roots: &[P]) -> OrganizerResult<()> {
        self.unwatch()?;

        let roots: Vec<PathBuf> = roots.iter().map(|p| p.as_ref().to_path_buf()).collect();
        debug!(watch_dirs = ?roots, "watching");

        self.source = Some(EventSource::open(&roots)?);
        self.roots = roots;
        Ok(())
    }

    /// Closes the active subscription, if any.
    pub fn unwatch(&mut self) -> OrganizerResult<()> {
        if let Some(source) = self.source.take() {
            debug!("Closing subscription");
            source.close()?;
        }
        self.roots.clear();
        Ok(())
    }

    /// Handles every event queued right now and returns how many there were.
    ///
    /// Never blocks. Returns `Ok(0)` when nothing is being watched.
    pub fn pump(&mut self) -> OrganizerResult<usize> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };

        let events = source.pending()?;
        let count = events.len();
        for event in events {
            self.dispatch(event)?;
        }

        Ok(count)
    }

    /// Handles events as they arrive until a filesystem failure occurs.
    ///
    /// Returns `Ok(())` straight away when nothing is being watched.
    pub fn run(&mut self) -> OrganizerResult<()> {
        loop {
            let Some(source) = self.source.as_mut() else {
                return Ok(());
            };

            for event in source.next_batch()? {
                self.dispatch(event)?;
            }
        }
    }

    /// Brings the library in line with what is already in `roots`.
    ///
    /// Entries without a source are pruned first, then every direct child
    /// of every root is replayed as a create.
    pub fn sync<P: AsRef<Path>>(&mut self, roots: &[P]) -> OrganizerResult<Vec<Outcome>> {
        let pruned = self.reconciler.prune_orphans(roots)?;
        debug!(count = pruned.len(), "Pruned orphaned entries");

        let mut outcomes = Vec::new();
        for root in roots {
            let mut children: Vec<PathBuf> = fs::read_dir(root.as_ref())?
                .filter_map(|res| res.ok().map(|entry| entry.path()))
                .collect();
            children.sort();

            for child in children {
                let is_dir = child.is_dir();
                outcomes.push(self.dispatch(FilesystemEvent::created(child, is_dir))?);
            }
        }

        Ok(outcomes)
    }

    /// Routes one normalized event to the reconciler.
    pub fn dispatch(&mut self, event: FilesystemEvent) -> OrganizerResult<Outcome> {
        match (event.scope, event.kind) {
            (EventScope::WatchRoot, EventKind::Created) => {
                let outcome = self.reconciler.on_created(&event.path, event.is_dir)?;
                match outcome {
                    Outcome::AwaitingPayload { folder } => self.await_payload(&folder),
                    other => Ok(other),
                }
            }
            (EventScope::WatchRoot, EventKind::Deleted) => {
                if event.is_dir {
                    if let Some(source) = self.source.as_mut() {
                        source.unwatch_folder(&event.path);
                    }
                }
                Ok(self.reconciler.on_deleted(&event.path, event.is_dir)?)
            }
            (EventScope::EpisodeFolder, EventKind::Created) => match event.path.parent() {
                Some(folder) => {
                    let folder = folder.to_path_buf();
                    self.settle_folder(&folder)
                }
                None => Ok(Outcome::Skipped(SkipReason::NotMedia)),
            },
            (EventScope::EpisodeFolder, EventKind::Deleted) => {
                Ok(Outcome::Skipped(SkipReason::NotMedia))
            }
        }
    }

    fn await_payload(&mut self, folder: &Path) -> OrganizerResult<Outcome> {
        if let Some(source) = self.source.as_mut() {
            match source.watch_folder(folder) {
                Ok(()) => {}
                Err(WatchError::Watch { source, .. }) if source.kind() == ErrorKind::NotFound => {
                    debug!(path = %folder.display(), "Episode folder vanished");
                    return Ok(Outcome::Skipped(SkipReason::NotMedia));
                }
                Err(e) => return Err(e.into()),
            }
        }

        // the payload may have landed before the folder watch existed
        self.settle_folder(folder)
    }

    fn settle_folder(&mut self, folder: &Path) -> OrganizerResult<Outcome> {
        let outcome = self.reconciler.on_created(folder, true)?;

        if !matches!(outcome, Outcome::AwaitingPayload { .. }) {
            if let Some(source) = self.source.as_mut() {
                source.unwatch_folder(folder);
            }
        }

        Ok(outcome)
    }
}
