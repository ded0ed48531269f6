use crate::files::{FileDescriptor, TransferMode};

/// Working state of one record's migration, filled stage by stage.
pub struct MigrationContext {
    pub source_id: String,

    // Pre-flight result: files awaiting transfer in stage 6
    pub files: Vec<FileDescriptor>,

    // Stage 1 result; later stages require it
    pub target_id: Option<String>,

    // Stage 6 results
    pub uploaded_files: Vec<FileDescriptor>,

    // Non-fatal stage failures, in stage order
    pub errors: Vec<String>,
}

impl MigrationContext {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            files: Vec::new(),
            target_id: None,
            uploaded_files: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Outcome of one record's migration. Immutable once the orchestrator
/// finishes; ownership passes to the progress ledger.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub source_id: String,
    pub target_id: Option<String>,
    /// True iff a target resource exists (stage 1 succeeded). Stages 2-7
    /// are best-effort; their failures appear only in `error_messages`.
    pub success: bool,
    /// Record was skipped by the opt-in already-migrated policy.
    pub skipped: bool,
    pub error_messages: Vec<String>,
    /// Files that reached the target, references included.
    pub uploaded_files: Vec<FileDescriptor>,
    /// Megabytes actually transferred byte-for-byte (Concrete mode only).
    pub total_uploaded_mb: f64,
}

impl MigrationResult {
    pub fn from_context(ctx: MigrationContext) -> Self {
        let success = ctx.target_id.is_some();
        let total_uploaded_mb = ctx
            .uploaded_files
            .iter()
            .filter(|f| f.transfer_mode == TransferMode::Concrete)
            .filter_map(|f| f.size_mb)
            .sum();
        Self {
            source_id: ctx.source_id,
            target_id: ctx.target_id,
            success,
            skipped: false,
            error_messages: ctx.errors,
            uploaded_files: ctx.uploaded_files,
            total_uploaded_mb,
        }
    }

    /// Record failed before or at stage 1; no target resource exists.
    pub fn failure(source_id: impl Into<String>, error_messages: Vec<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: None,
            success: false,
            skipped: false,
            error_messages,
            uploaded_files: Vec::new(),
            total_uploaded_mb: 0.0,
        }
    }

    pub fn skipped(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: Some(target_id.into()),
            success: true,
            skipped: true,
            error_messages: Vec::new(),
            uploaded_files: Vec::new(),
            total_uploaded_mb: 0.0,
        }
    }
}
