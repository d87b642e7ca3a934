mod error;
pub mod models;
pub mod orchestrator;
pub mod overlay;
pub mod remapper;

pub use error::{Error, ErrorKind, Interrupt, Operation};
pub use models::{
    BackupJob, CreateBackupRequest, CreateRestoreRequest, JobStatus, LogicalDatabaseBackup,
    LogicalDatabaseRestore, RestoreJob, RestoreMapping,
};
pub use orchestrator::Orchestrator;
pub use remapper::{DbInfo, HashedNameGenerator, NameError, NameGenerator};
