//! File classification: parses the export's packed component-files field and
//! decides, per file, whether bytes move or only a pointer is registered.

pub mod classifier;
pub mod probe;

pub use classifier::{classify, parse_component_files, ClassifyPolicy, ComponentFile};
pub use probe::{HttpSizeProbe, SizeCache, SizeProbe};

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Pointer/URL plus descriptive metadata only; bytes are never moved.
    Reference,
    /// Full byte transfer into the target repository.
    Concrete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub file_name: String,
    /// Source path or URL the bytes (or the pointer) come from.
    pub source: String,
    pub transfer_mode: TransferMode,
    /// Unknown when the size probe failed; classification policy decides
    /// which way unknown sizes lean.
    pub size_mb: Option<f64>,
    /// Descriptive per-file metadata attached after upload/registration.
    pub metadata: BTreeMap<String, String>,
}

impl FileDescriptor {
    /// Big reference files are reported separately in the run summary.
    pub fn is_big(&self, threshold_mb: f64) -> bool {
        self.size_mb.map(|s| s > threshold_mb).unwrap_or(false)
    }
}
