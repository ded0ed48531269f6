use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub repository: RepositoryConfig,
    /// Path to the JSON export of the legacy CMS.
    pub records_path: String,
    /// CZO group name → repository group directory for creator resolution.
    #[serde(default)]
    pub groups: Vec<GroupMapping>,
    /// Files above this size are migrated as references, not byte-for-byte.
    #[serde(default = "default_big_file_threshold_mb")]
    pub big_file_threshold_mb: f64,
    /// Direction for files whose size could not be resolved. `false` keeps
    /// ambiguous files Concrete; `true` treats them as over-threshold.
    #[serde(default)]
    pub unknown_size_is_reference: bool,
    /// Reuse previously downloaded copies instead of re-fetching.
    #[serde(default = "default_true")]
    pub use_cached_files: bool,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Opt-in: skip a record whose source id already maps to a successful
    /// target id in the run's lookup table.
    #[serde(default)]
    pub skip_already_migrated: bool,
    /// Lookup CSV from an earlier run, seeded into the ledger at startup so
    /// the skip policy can recognize records migrated before this run.
    #[serde(default)]
    pub previous_lookup_path: Option<String>,
    #[serde(default)]
    pub selection: RecordSelection,
    /// Where the lookup table is written at run end.
    #[serde(default = "default_lookup_dir")]
    pub lookup_dir: String,
}

fn default_big_file_threshold_mb() -> f64 {
    500.0
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> String {
    "./tmp".to_string()
}

fn default_lookup_dir() -> String {
    "./logs".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMapping {
    /// CZO group name as spelled in the legacy export (case-insensitive).
    pub czo: String,
    /// Organization name in the target repository.
    pub group: String,
}

/// Which rows of the export to process. Serialized externally tagged:
/// `"all"`, `{"first_n": 10}` or `{"ids": ["3884", "2414"]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSelection {
    #[default]
    All,
    FirstN(usize),
    Ids(Vec<String>),
}
