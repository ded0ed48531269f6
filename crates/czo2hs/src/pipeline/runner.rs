use tracing::{error, info, info_span, warn};

use crate::files::classifier::ClassifyPolicy;
use crate::files::probe::{SizeCache, SizeProbe};
use crate::files::{self, FileDescriptor, TransferMode};
use crate::metadata::{self, creator::CreatorResolver, MetadataBundle};
use crate::pipeline::context::{MigrationContext, MigrationResult};
use crate::pipeline::error::{PreflightError, StageError};
use crate::pipeline::ledger::ProgressLedger;
use crate::repository::RepositoryClient;
use crate::source::{SourceRecord, COMPONENT_FILES_COLUMN};

/// Per-record knobs, all configuration rather than code paths.
#[derive(Debug, Clone, Copy)]
pub struct MigrationPolicy {
    pub classify: ClassifyPolicy,
    /// Opt-in: a source id already mapped to a successful target id in this
    /// run's lookup table is not migrated again. Off by default because a
    /// re-run otherwise creates a second target resource (the remote API has
    /// no idempotency key).
    pub skip_already_migrated: bool,
}

/// Drives the staged migration of one record against the remote repository.
///
/// The stages form a linear state machine: create resource, then the four
/// metadata updates, then file transfers, then visibility. Every stage after
/// creation is best-effort — a failure becomes a message on the record's
/// error list and the next stage still runs, because partial metadata beats
/// none and the API offers no compensating transaction to roll back with.
pub struct Migrator<'a> {
    client: &'a dyn RepositoryClient,
    creators: &'a dyn CreatorResolver,
    probe: &'a dyn SizeProbe,
    cache: &'a SizeCache,
    policy: MigrationPolicy,
}

impl<'a> Migrator<'a> {
    pub fn new(
        client: &'a dyn RepositoryClient,
        creators: &'a dyn CreatorResolver,
        probe: &'a dyn SizeProbe,
        cache: &'a SizeCache,
        policy: MigrationPolicy,
    ) -> Self {
        Self {
            client,
            creators,
            probe,
            cache,
            policy,
        }
    }

    /// Migrates one record. Never panics and never aborts the run: every
    /// outcome, including pre-flight failures, comes back as a
    /// `MigrationResult` for the ledger.
    pub fn migrate(&self, record: &SourceRecord, ledger: &ProgressLedger) -> MigrationResult {
        let source_id = record.source_id().unwrap_or("unknown").to_string();
        let _span = info_span!("record", czo_id = %source_id).entered();

        if self.policy.skip_already_migrated {
            if let Some(row) = ledger.find(&source_id) {
                if row.success {
                    let target_id = row.target_id.clone().unwrap_or_default();
                    info!(target_id, "Already migrated, skipping");
                    return MigrationResult::skipped(source_id, target_id);
                }
            }
        }

        // Pre-flight: assemble and classify before any remote call, so a
        // malformed row fails with zero side effects.
        let (bundle, file_list) = match self.preflight(record) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Record failed pre-flight: {}", e);
                return MigrationResult::failure(source_id, vec![e.to_string()]);
            }
        };

        let mut ctx = MigrationContext::new(source_id);
        ctx.files = file_list;

        // Stage 1 is the only record-fatal stage: without a target id there
        // is nothing to attach the remaining stages to.
        let target_id = match self.step_create_resource(&bundle) {
            Ok(target_id) => target_id,
            Err(e) => {
                error!("{}", e);
                ctx.errors.push(e.to_string());
                return MigrationResult::from_context(ctx);
            }
        };
        ctx.target_id = Some(target_id.clone());

        self.step_update_metadata(&target_id, &bundle, &mut ctx);
        self.step_upload_files(&target_id, &mut ctx);
        self.step_finalize(&target_id, &mut ctx);

        info!(
            target_id = ctx.target_id.as_deref().unwrap_or(""),
            errors = ctx.errors.len(),
            "Record migrated"
        );
        MigrationResult::from_context(ctx)
    }

    fn preflight(
        &self,
        record: &SourceRecord,
    ) -> Result<(MetadataBundle, Vec<FileDescriptor>), PreflightError> {
        let bundle = metadata::assemble(record, self.creators)?;
        // An absent packed column reads as "no component files".
        let packed = record.get(COMPONENT_FILES_COLUMN).unwrap_or("");
        let file_list = files::classify(packed, &self.policy.classify, self.probe, self.cache)?;
        Ok((bundle, file_list))
    }

    fn step_create_resource(&self, bundle: &MetadataBundle) -> Result<String, StageError> {
        self.client
            .create_resource(&bundle.title, &bundle.extra_metadata)
            .map_err(StageError::ResourceCreation)
    }

    /// Stages 2-5. Each element group goes in its own call so a failure can
    /// be attributed; a failed group is recorded and the next one still runs.
    fn step_update_metadata(
        &self,
        target_id: &str,
        bundle: &MetadataBundle,
        ctx: &mut MigrationContext,
    ) {
        let mut errors = Vec::new();

        let mut apply = |stage: &'static str, result: Result<(), crate::repository::ClientError>| {
            if let Err(source) = result {
                let err = StageError::Metadata { stage, source };
                warn!("{}", err);
                errors.push(err.to_string());
            }
        };

        apply(
            "description",
            self.client.set_description(target_id, &bundle.abstract_text),
        );
        apply(
            "keywords",
            self.client.set_keywords(target_id, &bundle.keywords),
        );
        apply(
            "creator",
            self.client.set_creator(target_id, &bundle.creator),
        );
        // Spatial and temporal coverage travel in one combined call; the
        // server erases one when the other is submitted alone.
        if let Some(coverage) = &bundle.coverage {
            apply("coverage", self.client.set_coverage(target_id, coverage));
        }

        ctx.errors.append(&mut errors);
    }

    /// Stage 6. Files are attempted independently: one failed file is
    /// recorded and the rest still transfer.
    fn step_upload_files(&self, target_id: &str, ctx: &mut MigrationContext) {
        let file_list = std::mem::take(&mut ctx.files);

        for file in file_list {
            match self.transfer_file(target_id, &file) {
                Ok(()) => ctx.uploaded_files.push(file),
                Err(e) => {
                    warn!("{}", e);
                    ctx.errors.push(e.to_string());
                }
            }
        }
    }

    fn transfer_file(&self, target_id: &str, file: &FileDescriptor) -> Result<(), StageError> {
        let fail = |source| StageError::FileTransfer {
            file_name: file.file_name.clone(),
            source,
        };

        let file_id = match file.transfer_mode {
            TransferMode::Reference => self
                .client
                .register_reference_file(target_id, &file.file_name, &file.source)
                .map_err(fail)?,
            TransferMode::Concrete => {
                self.client
                    .upload_concrete_file(target_id, &file.file_name, &file.source)
                    .map_err(fail)?;
                self.client
                    .find_file_id_by_name(target_id, &file.file_name)
                    .map_err(fail)?
            }
        };

        self.client
            .attach_file_metadata(target_id, &file_id, &file.metadata)
            .map_err(fail)
    }

    /// Stage 7. A resource with zero successfully attached files stays
    /// non-public: a file-less partial migration should not be discoverable.
    fn step_finalize(&self, target_id: &str, ctx: &mut MigrationContext) {
        if ctx.uploaded_files.is_empty() {
            info!("No files attached, resource stays non-public");
            return;
        }
        if let Err(source) = self.client.set_public(target_id) {
            let err = StageError::Finalization(source);
            warn!("{}", err);
            ctx.errors.push(err.to_string());
        }
    }
}
