use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

use crate::dao::storage::{StorageError, UniqueConstraint};

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server code reported when a write collides with a unique index.
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("unique constraint violated in collection `{collection}`")]
    Duplicate {
        collection: &'static str,
        constraint: UniqueConstraint,
    },
    #[error("failed to write to collection `{collection}`")]
    Write {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to read from collection `{collection}`")]
    Read {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to clear collection `{collection}`")]
    Clear {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("stored round has an invalid identifier `{value}`")]
    InvalidRoundId {
        value: String,
        #[source]
        source: uuid::Error,
    },
}

impl MongoDaoError {
    /// Classify a failed write, turning duplicate-key errors into constraint violations.
    pub fn from_write(
        collection: &'static str,
        constraint: UniqueConstraint,
        source: MongoError,
    ) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::Duplicate {
                collection,
                constraint,
            }
        } else {
            MongoDaoError::Write { collection, source }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Duplicate { constraint, .. } => StorageError::UniqueViolation(constraint),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
