use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Czo2HsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source data error: {0}")]
    Source(#[from] SourceError),

    #[error("Repository client error: {0}")]
    Client(#[from] crate::repository::ClientError),

    #[error("Size probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read records file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse records JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Records file must contain a JSON array of objects, row {row} is not an object")]
    InvalidRow { row: usize },
}

/// Pre-flight failures while assembling the metadata bundle from a raw row.
/// Raised before any remote call, so a bad row has zero side effects.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Required field '{0}' is missing")]
    FieldMissing(String),

    #[error("Field '{field}' has unparsable value '{value}': {reason}")]
    FieldFormat {
        field: String,
        value: String,
        reason: String,
    },
}

/// The packed component-files field could not be parsed. The whole record
/// fails, not just the bad entry, so the caller surfaces one coherent error.
#[derive(Error, Debug)]
pub enum FileFieldError {
    #[error("Malformed file entry '{entry}': expected 5 to 7 '$'-separated sub-fields, got {found}")]
    Malformed { entry: String, found: usize },
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Size probe request failed for '{url}': {reason}")]
    Request { url: String, reason: String },

    #[error("No Content-Length reported for '{url}'")]
    MissingContentLength { url: String },
}

pub type Result<T> = std::result::Result<T, Czo2HsError>;
