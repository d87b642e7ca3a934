use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::models::DaemonRestoreMapping;

/// Shape of the daemon exchange. Only serialization differs between versions;
/// endpoints and status handling are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WireContract {
    /// Dry run travels in the restore body, `blobPath` qualifies track and evict calls.
    #[default]
    V2,
    /// Older daemons: no `dryRun` body field and no `blobPath` qualifier.
    Legacy,
}

impl WireContract {
    pub fn backup_body(&self, storage_name: &str, blob_path: &str, databases: &[String]) -> Value {
        json!({
            "storageName": storage_name,
            "blobPath": blob_path,
            "databases": databases,
        })
    }

    pub fn restore_body(
        &self,
        storage_name: &str,
        blob_path: &str,
        databases: &[DaemonRestoreMapping],
        dry_run: bool,
    ) -> Value {
        let mut body = json!({
            "storageName": storage_name,
            "blobPath": blob_path,
            "databases": databases,
        });
        if *self == Self::V2 {
            body["dryRun"] = Value::Bool(dry_run);
        }
        body
    }

    pub fn restore_query(&self, dry_run: bool) -> Vec<(&'static str, String)> {
        match self {
            Self::Legacy if dry_run => vec![("dryRun", "true".to_string())],
            _ => Vec::new(),
        }
    }

    /// Query that scopes a job id to its blob path.
    pub fn qualifier(&self, blob_path: &str) -> Vec<(&'static str, String)> {
        match self {
            Self::V2 if !blob_path.is_empty() => vec![("blobPath", blob_path.to_string())],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> Vec<DaemonRestoreMapping> {
        vec![DaemonRestoreMapping {
            previous_database_name: "orders".into(),
            database_name: "ns1_svc1_0123456789ab".into(),
        }]
    }

    #[test]
    fn v2_restore_body_carries_dry_run() {
        let body = WireContract::V2.restore_body("s1", "b1", &mappings(), true);

        assert_eq!(body["dryRun"], Value::Bool(true));
        assert_eq!(body["databases"][0]["previousDatabaseName"], "orders");
        assert!(WireContract::V2.restore_query(true).is_empty());
    }

    #[test]
    fn legacy_restore_moves_dry_run_to_query() {
        let body = WireContract::Legacy.restore_body("s1", "b1", &mappings(), true);

        assert!(body.get("dryRun").is_none());
        assert_eq!(
            WireContract::Legacy.restore_query(true),
            vec![("dryRun", "true".to_string())]
        );
        assert!(WireContract::Legacy.restore_query(false).is_empty());
    }

    #[test]
    fn qualifier_depends_on_contract_and_blob_path() {
        assert_eq!(
            WireContract::V2.qualifier("b1"),
            vec![("blobPath", "b1".to_string())]
        );
        assert!(WireContract::V2.qualifier("").is_empty());
        assert!(WireContract::Legacy.qualifier("b1").is_empty());
    }

    #[test]
    fn backup_body_is_shared() {
        let dbs = vec!["db1".to_string(), "db2".to_string()];

        assert_eq!(
            WireContract::V2.backup_body("s1", "b1", &dbs),
            WireContract::Legacy.backup_body("s1", "b1", &dbs)
        );
        assert_eq!(
            WireContract::V2.backup_body("s1", "b1", &dbs),
            json!({"storageName": "s1", "blobPath": "b1", "databases": ["db1", "db2"]})
        );
    }
}
