pub mod context;
pub mod error;
pub mod ledger;
pub mod runner;

pub use context::{MigrationContext, MigrationResult};
pub use error::{PreflightError, StageError};
pub use ledger::{LookupRow, ProgressLedger, RunSummary};
pub use runner::{MigrationPolicy, Migrator};
