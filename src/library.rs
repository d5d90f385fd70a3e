use crate::series::SeriesKey;
use std::fs::{self, DirBuilder, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Mode for new series directories: owner and group get everything, others nothing.
pub const SERIES_DIR_MODE: u32 = 0o770;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("library root not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("library root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to create series directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to link {} to {}: {source}", .from.display(), .to.display())]
    Link {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of asking the library to link a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Created,
    AlreadyPresent,
}

/// The library root: one directory per series, each holding hard links
/// to episode files that live under the watch roots.
///
/// Nothing is cached here. Every call looks at the filesystem.
#[derive(Debug, Clone)]
pub struct Library {
    pub root: PathBuf,
}

impl Library {
    /// Opens an existing library root.
    ///
    /// - Returns [`LibraryError::NotFound`] if the path does not exist.
    /// - Returns [`LibraryError::NotADirectory`] if it exists but is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let root = root.into();

        if !root.exists() {
            return Err(LibraryError::NotFound(root));
        }

        if !root.is_dir() {
            return Err(LibraryError::NotADirectory(root));
        }

        Ok(Self { root })
    }

    pub fn series_dir(&self, series: &SeriesKey) -> PathBuf {
        self.root.join(series)
    }

    /// Expected location of the library entry for `basename` in `series`.
    pub fn entry_path(&self, series: &SeriesKey, basename: &Path) -> PathBuf {
        self.series_dir(series).join(basename)
    }

    /// Creates the series directory if it is missing.
    ///
    /// The mode is set explicitly after creation so the process umask
    /// cannot widen or narrow it.
    pub fn ensure_series_dir(&self, series: &SeriesKey) -> Result<PathBuf, LibraryError> {
        let dir = self.series_dir(series);
        if dir.is_dir() {
            return Ok(dir);
        }

        debug!(path = %dir.display(), "Creating directory");
        let created = DirBuilder::new()
            .mode(SERIES_DIR_MODE)
            .create(&dir)
            .and_then(|()| fs::set_permissions(&dir, Permissions::from_mode(SERIES_DIR_MODE)));

        match created {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(dir),
            Err(source) => Err(LibraryError::CreateDir { path: dir, source }),
        }
    }

    /// Hard links `source` into the directory for `series`.
    ///
    /// Source and library must share a volume; a cross-device link fails
    /// with [`LibraryError::Link`]. An existing object at the target is
    /// left untouched.
    pub fn link(&self, source: &Path, series: &SeriesKey) -> Result<LinkStatus, LibraryError> {
        let basename = source
            .file_name()
            .ok_or_else(|| LibraryError::NotFound(source.to_path_buf()))?;
        let existed = self.series_dir(series).is_dir();
        let series_dir = self.ensure_series_dir(series)?;
        let target = series_dir.join(basename);

        if fs::symlink_metadata(&target).is_ok() {
            return Ok(LinkStatus::AlreadyPresent);
        }

        debug!(from = %source.display(), to = %target.display(), "Linking file");
        match fs::hard_link(source, &target) {
            Ok(()) => Ok(LinkStatus::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(LinkStatus::AlreadyPresent),
            Err(source_err) => {
                // a series directory never exists without an entry in it
                if !existed {
                    if let Err(e) = fs::remove_dir(&series_dir) {
                        debug!(path = %series_dir.display(), error = %e, "Could not roll back directory");
                    }
                }
                Err(LibraryError::Link {
                    from: source.to_path_buf(),
                    to: target,
                    source: source_err,
                })
            }
        }
    }

    /// Removes the library entry at `entry`.
    pub fn unlink(&self, entry: &Path) -> Result<(), LibraryError> {
        debug!(path = %entry.display(), "Deleting file");
        fs::remove_file(entry).map_err(|source| LibraryError::Remove {
            path: entry.to_path_buf(),
            source,
        })
    }

    /// Deletes the series directory when nothing is left in it.
    ///
    /// Returns `true` if the directory was removed.
    pub fn remove_series_dir_if_empty(&self, series: &SeriesKey) -> Result<bool, LibraryError> {
        self.prune_dir_if_empty(&self.series_dir(series))
    }

    pub fn prune_dir_if_empty(&self, dir: &Path) -> Result<bool, LibraryError> {
        if fs::read_dir(dir)?.next().is_some() {
            return Ok(false);
        }

        debug!(path = %dir.display(), "Deleting directory");
        fs::remove_dir(dir).map_err(|source| LibraryError::Remove {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(true)
    }

    /// Lists the series directories currently present, sorted by name.
    pub fn series(&self) -> Result<Vec<PathBuf>, LibraryError> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|res| {
                let entry = res.ok()?;
                let ft = entry.file_type().ok()?;
                if ft.is_dir() { Some(entry.path()) } else { None }
            })
            .collect();
        dirs.sort();

        Ok(dirs)
    }
}
