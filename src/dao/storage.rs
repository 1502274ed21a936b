use std::{error::Error, fmt};
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Uniqueness rules the storage backends enforce atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// First names are unique regardless of case.
    UserFirstName,
    /// A user owns at most one song.
    SongOwner,
    /// A voter guesses a given song at most once.
    VotePerSong,
    /// At most one round is live at a time.
    ActiveRound,
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            UniqueConstraint::UserFirstName => "this first name is already registered",
            UniqueConstraint::SongOwner => "this user has already submitted a song",
            UniqueConstraint::VotePerSong => "you have already voted for this song",
            UniqueConstraint::ActiveRound => "a voting round is already in progress",
        };
        f.write_str(message)
    }
}

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed or could not be reached.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The write would break a uniqueness rule; nothing was written.
    #[error("{0}")]
    UniqueViolation(UniqueConstraint),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
