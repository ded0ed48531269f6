//! Target repository access. The migration core only sees the
//! [`RepositoryClient`] trait; the shipped implementation talks to a
//! HydroShare-style REST API.

pub mod http;

pub use http::HttpRepositoryClient;

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::metadata::{Coverage, Creator};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status} for {operation}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Response missing field '{0}'")]
    MissingField(&'static str),

    #[error("File '{0}' not found in resource file listing")]
    FileNotFound(String),

    #[error("Failed to stage local copy of '{url}': {reason}")]
    Download { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authenticated handle on the target repository. One method per remote
/// operation so the orchestrator can isolate failures stage by stage; none
/// of the calls are idempotent at the API level.
pub trait RepositoryClient {
    /// Creates the target resource and returns its id. Extended metadata is
    /// submitted here because the API has no separate update call for it.
    fn create_resource(
        &self,
        title: &str,
        extra_metadata: &BTreeMap<String, String>,
    ) -> Result<String, ClientError>;

    fn set_description(&self, resource_id: &str, abstract_text: &str) -> Result<(), ClientError>;

    fn set_keywords(
        &self,
        resource_id: &str,
        keywords: &BTreeSet<String>,
    ) -> Result<(), ClientError>;

    fn set_creator(&self, resource_id: &str, creator: &Creator) -> Result<(), ClientError>;

    /// Submits spatial and temporal coverage in one combined call. The
    /// server replaces the whole coverage set on every write, so splitting
    /// this into two calls would erase one half.
    fn set_coverage(&self, resource_id: &str, coverage: &Coverage) -> Result<(), ClientError>;

    /// Registers a pointer record for a reference file; returns the
    /// server-assigned file id. No bytes are moved.
    fn register_reference_file(
        &self,
        resource_id: &str,
        file_name: &str,
        ref_url: &str,
    ) -> Result<String, ClientError>;

    /// Full byte transfer of one file into the resource.
    fn upload_concrete_file(
        &self,
        resource_id: &str,
        file_name: &str,
        source: &str,
    ) -> Result<(), ClientError>;

    /// Resolves the server-assigned id of an uploaded file. The upload call
    /// does not return it, so concrete transfers need this extra lookup.
    fn find_file_id_by_name(
        &self,
        resource_id: &str,
        file_name: &str,
    ) -> Result<String, ClientError>;

    fn attach_file_metadata(
        &self,
        resource_id: &str,
        file_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), ClientError>;

    fn set_public(&self, resource_id: &str) -> Result<(), ClientError>;
}
