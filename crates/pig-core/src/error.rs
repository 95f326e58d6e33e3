use std::path::PathBuf;
use thiserror::Error;

/// Environment and configuration errors raised before any dispatch starts.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read env file at {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("User home directory not found")]
    HomeNotFound,

    #[error("User home directory {path} does not exist")]
    HomeMissing { path: PathBuf },
}
