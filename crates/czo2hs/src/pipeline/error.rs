use thiserror::Error;

use crate::error::{FileFieldError, MetadataError};
use crate::repository::ClientError;

/// Failure before stage 1: the record fails with zero remote side effects.
#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("Metadata assembly failed: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Component files field could not be parsed: {0}")]
    FileField(#[from] FileFieldError),
}

/// Per-stage failures. Only `ResourceCreation` is fatal for the record;
/// every other variant is converted to a message on the record's error list
/// and the run proceeds to the next stage or file.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Resource creation failed: {0}")]
    ResourceCreation(ClientError),

    #[error("Failed to update {stage}: {source}")]
    Metadata {
        stage: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("File transfer failed for '{file_name}': {source}")]
    FileTransfer {
        file_name: String,
        #[source]
        source: ClientError,
    },

    #[error("Finalization failed: {0}")]
    Finalization(ClientError),
}
