use std::path::PathBuf;
use thiserror::Error;

use crate::form::FieldErrors;

#[derive(Error, Debug)]
pub enum UsersError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid timeout: {0} (expected a positive number of seconds)")]
    InvalidTimeout(String),

    #[error("Form has {} invalid field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Could not generate an unused id (last tried {0})")]
    IdCollision(String),

    #[error("User not found: {0}")]
    UserNotFound(String),
}

pub type Result<T> = std::result::Result<T, UsersError>;
