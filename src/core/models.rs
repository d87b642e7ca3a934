use serde::{Deserialize, Serialize};

/// Lifecycle state shared by backup and restore jobs and by their per-database entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// Backup state of a single logical database.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalDatabaseBackup {
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

impl LogicalDatabaseBackup {
    pub fn not_started(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            status: JobStatus::NotStarted,
            ..Default::default()
        }
    }
}

/// Client-facing view of a backup job owned by the daemon.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupJob {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub backup_id: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    #[serde(default)]
    pub storage_name: String,
    #[serde(default)]
    pub blob_path: String,
    #[serde(default)]
    pub databases: Vec<LogicalDatabaseBackup>,
}

/// Restore state of a single logical database.
///
/// `previous_database_name` is the name recorded in the backup, `database_name`
/// the one the restored copy lives under.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalDatabaseRestore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microservice_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_database_name: Option<String>,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

/// Client-facing view of a restore job owned by the daemon.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreJob {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub restore_id: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    #[serde(default)]
    pub storage_name: String,
    #[serde(default)]
    pub blob_path: String,
    #[serde(default)]
    pub databases: Vec<LogicalDatabaseRestore>,
}

/// A database selected for backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDatabaseInfo {
    #[serde(default)]
    pub database_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBackupRequest {
    #[serde(default)]
    pub storage_name: String,
    #[serde(default)]
    pub blob_path: String,
    #[serde(default)]
    pub databases: Vec<BackupDatabaseInfo>,
}

/// Where one database from a backup should land when restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreMapping {
    #[serde(default)]
    pub microservice_name: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRestoreRequest {
    #[serde(default)]
    pub storage_name: String,
    #[serde(default)]
    pub blob_path: String,
    #[serde(default)]
    pub databases: Vec<RestoreMapping>,
}

/// Rename instruction sent to the daemon for one restored database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonRestoreMapping {
    pub previous_database_name: String,
    pub database_name: String,
}

impl CreateBackupRequest {
    /// Field-level validation. Returns one message per failed constraint.
    pub fn validate(&self) -> Vec<String> {
        let mut details = Vec::new();
        require(&mut details, "CreateBackupRequest.storageName", &self.storage_name);
        require(&mut details, "CreateBackupRequest.blobPath", &self.blob_path);
        if self.databases.is_empty() {
            details.push(failed("CreateBackupRequest.databases"));
        }
        for (i, db) in self.databases.iter().enumerate() {
            require(
                &mut details,
                &format!("CreateBackupRequest.databases[{i}].databaseName"),
                &db.database_name,
            );
        }
        details
    }

    pub fn database_names(&self) -> Vec<String> {
        self.databases
            .iter()
            .map(|db| db.database_name.clone())
            .collect()
    }
}

impl CreateRestoreRequest {
    /// Field-level validation. Returns one message per failed constraint.
    pub fn validate(&self) -> Vec<String> {
        let mut details = Vec::new();
        require(&mut details, "CreateRestoreRequest.storageName", &self.storage_name);
        require(&mut details, "CreateRestoreRequest.blobPath", &self.blob_path);
        if self.databases.is_empty() {
            details.push(failed("CreateRestoreRequest.databases"));
        }
        for (i, mapping) in self.databases.iter().enumerate() {
            let field = format!("CreateRestoreRequest.databases[{i}]");
            require(
                &mut details,
                &format!("{field}.microserviceName"),
                &mapping.microservice_name,
            );
            require(
                &mut details,
                &format!("{field}.databaseName"),
                &mapping.database_name,
            );
            require(&mut details, &format!("{field}.namespace"), &mapping.namespace);
        }
        details
    }
}

fn require(details: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        details.push(failed(field));
    }
}

fn failed(field: &str) -> String {
    format!("Field '{field}' failed validation: required")
}
