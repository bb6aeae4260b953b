use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("vault '{name}' already exists at {}", existing_path.display())]
    VaultAlreadyExists { name: String, existing_path: PathBuf },

    #[error("vault '{0}' does not exist")]
    VaultNotFound(String),

    #[error("no active vault, initialize one first")]
    VaultNotInitialized,

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("file type not present in path: {}", .0.display())]
    MissingFileType(PathBuf),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("path is outside the vault: {}", .0.display())]
    FileOutsideVault(PathBuf),

    #[error("file already exists in the vault: {} (use overwrite)", .0.display())]
    FileAlreadyExists(PathBuf),

    #[error("empty query")]
    EmptyQuery,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("metadata key '{0}' is reserved")]
    ReservedMetadataKey(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification for transport layers (HTTP status, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    BadRequest,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::VaultAlreadyExists { .. } | Error::FileAlreadyExists(_) => ErrorKind::Conflict,
            Error::VaultNotFound(_) => ErrorKind::NotFound,
            Error::VaultNotInitialized
            | Error::UnsupportedFileType(_)
            | Error::MissingFileType(_)
            | Error::FileOutsideVault(_)
            | Error::EmptyQuery
            | Error::InvalidConfig(_)
            | Error::ReservedMetadataKey(_) => ErrorKind::BadRequest,
            Error::Extraction(_)
            | Error::Config(_)
            | Error::Embedding(_)
            | Error::Store(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
