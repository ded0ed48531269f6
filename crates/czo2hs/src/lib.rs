pub mod config;
pub mod error;
pub mod files;
pub mod metadata;
pub mod pipeline;
pub mod repository;
pub mod source;

pub use config::{load_config, Config, RecordSelection};
pub use error::{Czo2HsError, FileFieldError, MetadataError, Result};
pub use files::{classify, ClassifyPolicy, FileDescriptor, SizeCache, TransferMode};
pub use metadata::{assemble, GroupDirectory, MetadataBundle};
pub use pipeline::{MigrationPolicy, MigrationResult, Migrator, ProgressLedger};
pub use repository::{HttpRepositoryClient, RepositoryClient};
pub use source::{JsonRecordProvider, RecordProvider, SourceRecord};
