use std::collections::BTreeMap;

use tracing::warn;

use crate::error::FileFieldError;
use crate::files::probe::{SizeCache, SizeProbe};
use crate::files::{FileDescriptor, TransferMode};

/// One parsed entry of the packed component-files field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFile {
    pub location: String,
    pub topic: String,
    pub url: String,
    pub data_level: String,
    /// Explicitly flagged private/reference-only by the source data.
    pub private: bool,
    pub doi: Option<String>,
    pub metadata_url: Option<String>,
}

/// Transfer-strategy knobs. Both values are configuration, not constants:
/// the unknown-size direction in particular is an explicit policy choice.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyPolicy {
    pub big_file_threshold_mb: f64,
    pub unknown_size_is_reference: bool,
}

/// Parses the packed field: entries separated by `|`, each entry 5-7
/// `$`-joined sub-fields (location, topic, url, data level, privacy flag,
/// optional DOI, optional metadata URL). Any entry with a sub-field-count
/// mismatch fails the whole record.
pub fn parse_component_files(packed: &str) -> Result<Vec<ComponentFile>, FileFieldError> {
    let mut files = Vec::new();
    for entry in packed.split('|') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let parts: Vec<&str> = entry.split('$').collect();
        if !(5..=7).contains(&parts.len()) {
            return Err(FileFieldError::Malformed {
                entry: entry.to_string(),
                found: parts.len(),
            });
        }
        files.push(ComponentFile {
            location: parts[0].trim().to_string(),
            topic: parts[1].trim().to_string(),
            url: parts[2].trim().to_string(),
            data_level: parts[3].trim().to_string(),
            private: parse_flag(parts[4]),
            doi: parts.get(5).map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from),
            metadata_url: parts
                .get(6)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from),
        });
    }
    Ok(files)
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Parses the packed field and decides the transfer strategy per file.
/// This is the one place the classifier performs I/O: a cache miss triggers
/// a size probe and the cache is updated. A failed probe degrades to an
/// unknown size rather than failing the record.
pub fn classify(
    packed: &str,
    policy: &ClassifyPolicy,
    probe: &dyn SizeProbe,
    cache: &SizeCache,
) -> Result<Vec<FileDescriptor>, FileFieldError> {
    let files = parse_component_files(packed)?;

    let mut descriptors = Vec::with_capacity(files.len());
    for file in files {
        let size_mb = resolve_size(&file.url, probe, cache);
        let transfer_mode = decide_mode(&file, size_mb, policy);
        descriptors.push(FileDescriptor {
            file_name: file_name_from_url(&file.url),
            metadata: file_metadata(&file),
            source: file.url,
            transfer_mode,
            size_mb,
        });
    }
    Ok(descriptors)
}

fn resolve_size(url: &str, probe: &dyn SizeProbe, cache: &SizeCache) -> Option<f64> {
    if let Some(size_mb) = cache.get(url) {
        return Some(size_mb);
    }
    match probe.probe_mb(url) {
        Ok(size_mb) => {
            cache.put(url, size_mb);
            Some(size_mb)
        }
        Err(e) => {
            warn!("Size probe failed, treating size as unknown: {}", e);
            None
        }
    }
}

fn decide_mode(file: &ComponentFile, size_mb: Option<f64>, policy: &ClassifyPolicy) -> TransferMode {
    if file.private {
        return TransferMode::Reference;
    }
    match size_mb {
        Some(size) if size > policy.big_file_threshold_mb => TransferMode::Reference,
        Some(_) => TransferMode::Concrete,
        None if policy.unknown_size_is_reference => TransferMode::Reference,
        None => TransferMode::Concrete,
    }
}

fn file_name_from_url(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    let name = trimmed.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        "file".to_string()
    } else {
        name.to_string()
    }
}

fn file_metadata(file: &ComponentFile) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("location".to_string(), file.location.clone());
    metadata.insert("topic".to_string(), file.topic.clone());
    metadata.insert("data_level".to_string(), file.data_level.clone());
    if let Some(doi) = &file.doi {
        metadata.insert("doi".to_string(), doi.clone());
    }
    if let Some(metadata_url) = &file.metadata_url {
        metadata.insert("metadata_url".to_string(), metadata_url.clone());
    }
    metadata
}
