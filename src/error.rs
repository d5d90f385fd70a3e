use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizerError {
    #[error(transparent)]
    Library(#[from] crate::library::LibraryError),

    #[error(transparent)]
    Watch(#[from] crate::watcher::WatchError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type OrganizerResult<T> = Result<T, OrganizerError>;
