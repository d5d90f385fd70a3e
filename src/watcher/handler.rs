use crate::library::{Library, LibraryError, LinkStatus};
use crate::series::{SeriesKey, SeriesNameParser};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &["mkv", "mp4"];
pub const DEFAULT_CANONICAL_EXTENSION: &str = "mkv";

/// Why an event led to no change in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The basename carries no season/episode marker.
    Unparseable,
    /// The resolved path is not a regular file with a media extension.
    NotMedia,
    /// Delete for a series that has no directory in the library.
    NoSeriesDir,
    /// Delete for an entry that is not in the library.
    NoEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Linked {
        series: SeriesKey,
        entry: PathBuf,
    },
    Unlinked {
        series: SeriesKey,
        entry: PathBuf,
        removed_series_dir: bool,
    },
    /// The link was already in place.
    AlreadySatisfied,
    /// An episode folder appeared before the file it is named after.
    AwaitingPayload {
        folder: PathBuf,
    },
    Skipped(SkipReason),
}

/// Name of the payload an episode folder is expected to hold:
/// the folder name with the canonical extension appended.
pub fn payload_name(folder: &Path, extension: &str) -> Option<OsString> {
    let mut name = folder.file_name()?.to_os_string();
    name.push(".");
    name.push(extension);
    Some(name)
}

/// Resolves a directory event to the episode file inside it,
/// `<name>/<name>.<extension>`.
pub fn episode_payload(folder: &Path, extension: &str) -> PathBuf {
    match payload_name(folder, extension) {
        Some(name) => folder.join(name),
        None => folder.to_path_buf(),
    }
}

/// Maps create and delete events onto the library tree.
///
/// Holds no record of what it has linked. Each call re-derives the expected
/// library path and checks the filesystem, so repeated delivery of the same
/// event is harmless.
#[derive(Debug, Clone)]
pub struct LibraryReconciler {
    library: Library,
    parser: SeriesNameParser,
    media_extensions: Vec<String>,
    canonical_extension: String,
}

impl LibraryReconciler {
    pub fn new(library: Library) -> Self {
        Self {
            library,
            parser: SeriesNameParser::new(),
            media_extensions: DEFAULT_MEDIA_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            canonical_extension: DEFAULT_CANONICAL_EXTENSION.to_owned(),
        }
    }

    pub fn with_parser(mut self, parser: SeriesNameParser) -> Self {
        self.parser = parser;
        self
    }

    /// Overrides the recognized media extensions (without the leading dot).
    ///
    /// Matching is case-sensitive.
    pub fn with_extensions<I, S>(mut self, extensions: I, canonical: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.media_extensions = extensions.into_iter().map(Into::into).collect();
        self.canonical_extension = canonical.into();
        self
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Links a newly arrived episode into its series directory.
    ///
    /// # Errors
    /// Returns [`LibraryError`] when the series directory or the hard link
    /// cannot be created. Everything else is reported through [`Outcome`].
    pub fn on_created(&self, path: &Path, is_dir: bool) -> Result<Outcome, LibraryError> {
        debug!(path = %path.display(), is_dir, "on_create");

        let Some(series) = self.series_for(path) else {
            return Ok(Outcome::Skipped(SkipReason::Unparseable));
        };

        let resolved = if is_dir {
            episode_payload(path, &self.canonical_extension)
        } else {
            path.to_path_buf()
        };

        if !(resolved.is_file() && self.is_media(&resolved)) {
            if is_dir && path.is_dir() && !resolved.exists() {
                debug!(path = %path.display(), "Episode folder has no payload yet");
                return Ok(Outcome::AwaitingPayload {
                    folder: path.to_path_buf(),
                });
            }
            debug!(path = %resolved.display(), "Ignoring non-media path");
            return Ok(Outcome::Skipped(SkipReason::NotMedia));
        }

        match self.library.link(&resolved, &series)? {
            LinkStatus::Created => {
                let entry = match resolved.file_name() {
                    Some(name) => self.library.entry_path(&series, Path::new(name)),
                    None => self.library.series_dir(&series),
                };
                Ok(Outcome::Linked { series, entry })
            }
            LinkStatus::AlreadyPresent => {
                debug!(path = %resolved.display(), "Already linked");
                Ok(Outcome::AlreadySatisfied)
            }
        }
    }

    /// Removes the library entry for a file that left a watch root, and the
    /// series directory with it once that directory is empty.
    ///
    /// For a directory event the entry looked up is the folder's payload
    /// name. Files removed from inside an episode folder are not tracked.
    pub fn on_deleted(&self, path: &Path, is_dir: bool) -> Result<Outcome, LibraryError> {
        debug!(path = %path.display(), is_dir, "on_delete");

        let Some(series) = self.series_for(path) else {
            return Ok(Outcome::Skipped(SkipReason::Unparseable));
        };

        let series_dir = self.library.series_dir(&series);
        if !series_dir.is_dir() {
            debug!(path = %series_dir.display(), "No series directory");
            return Ok(Outcome::Skipped(SkipReason::NoSeriesDir));
        }

        let lookup = if is_dir {
            payload_name(path, &self.canonical_extension)
        } else {
            path.file_name().map(OsStr::to_os_string)
        };
        let Some(lookup) = lookup else {
            return Ok(Outcome::Skipped(SkipReason::NoEntry));
        };

        let entry = series_dir.join(lookup);
        debug!(from = %path.display(), to = %entry.display(), "Deletion maps to entry");
        if !entry.is_file() {
            return Ok(Outcome::Skipped(SkipReason::NoEntry));
        }

        self.library.unlink(&entry)?;
        let removed_series_dir = self.library.remove_series_dir_if_empty(&series)?;

        Ok(Outcome::Unlinked {
            series,
            entry,
            removed_series_dir,
        })
    }

    /// Removes library entries whose source is gone from every watch root.
    ///
    /// An entry survives if some root holds a file of the same name or an
    /// episode folder named after the entry's stem. Series directories
    /// emptied by this pass are removed. Returns the removed entries.
    pub fn prune_orphans<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Vec<PathBuf>, LibraryError> {
        let mut removed = Vec::new();

        for series_dir in self.library.series()? {
            let mut pruned_here = false;

            for entry in fs::read_dir(&series_dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }

                let path = entry.path();
                let name = entry.file_name();
                let stem = path.file_stem();
                let present = roots.iter().any(|root| {
                    let root: &Path = root.as_ref();
                    root.join(&name).exists() || stem.is_some_and(|s| root.join(s).exists())
                });
                if present {
                    continue;
                }

                debug!(path = %path.display(), "Pruning orphaned entry");
                self.library.unlink(&path)?;
                removed.push(path);
                pruned_here = true;
            }

            if pruned_here {
                self.library.prune_dir_if_empty(&series_dir)?;
            }
        }

        Ok(removed)
    }

    fn series_for(&self, path: &Path) -> Option<SeriesKey> {
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            warn!(path = %path.display(), "Could not parse series name");
            return None;
        };

        match self.parser.parse(name) {
            Ok(series) => {
                debug!(path = %path.display(), series = %series, "Parsed series name");
                Some(series)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not parse series name");
                None
            }
        }
    }

    fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.media_extensions.iter().any(|m| m == ext))
    }
}
