//! Translates client backup/restore calls into backup daemon jobs.
//!
//! The orchestrator holds no job state. Every call makes exactly one daemon
//! request and projects the daemon's answer into the client-facing DTOs.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::error::{Error, Operation};
use super::models::{
    BackupJob, CreateRestoreRequest, DaemonRestoreMapping, JobStatus, LogicalDatabaseBackup,
    LogicalDatabaseRestore, RestoreJob,
};
use super::overlay::overlay;
use super::remapper::{DbInfo, NameGenerator};
use crate::context::RequestContext;
use crate::daemon::{DaemonRequest, DaemonTransport, Method, WireContract};

const STATUS_OK: u16 = 200;
const STATUS_ACCEPTED: u16 = 202;
const STATUS_NOT_FOUND: u16 = 404;

pub struct Orchestrator {
    transport: Arc<dyn DaemonTransport>,
    names: Arc<dyn NameGenerator>,
    contract: WireContract,
}

impl Orchestrator {
    pub fn new(
        transport: Arc<dyn DaemonTransport>,
        names: Arc<dyn NameGenerator>,
        contract: WireContract,
    ) -> Self {
        Self {
            transport,
            names,
            contract,
        }
    }

    /// Start a backup of `database_names`. `Ok(None)` when the daemon does not
    /// know the storage or one of the databases.
    pub async fn submit_backup(
        &self,
        ctx: &RequestContext,
        storage_name: &str,
        blob_path: &str,
        database_names: &[String],
    ) -> Result<Option<BackupJob>, Error> {
        let span = info_span!(
            "submit_backup",
            request_id = %ctx.request_id(),
            storage_name = %storage_name,
            blob_path = %blob_path,
        );

        async move {
            let request = DaemonRequest::new(Operation::SubmitBackup, Method::Post, &["backup"])
                .with_body(
                    self.contract
                        .backup_body(storage_name, blob_path, database_names),
                );

            let seed = BackupJob {
                status: JobStatus::NotStarted,
                storage_name: storage_name.to_string(),
                blob_path: blob_path.to_string(),
                databases: database_names
                    .iter()
                    .map(LogicalDatabaseBackup::not_started)
                    .collect(),
                ..Default::default()
            };

            let job = self.fetch(ctx, request, seed).await?;
            if let Some(job) = &job {
                info!(
                    backup_id = %job.backup_id,
                    databases = ?database_names,
                    "Backup started"
                );
            }
            Ok::<_, Error>(job)
        }
        .instrument(span)
        .await
    }

    pub async fn track_backup(
        &self,
        ctx: &RequestContext,
        backup_id: &str,
        blob_path: &str,
    ) -> Result<Option<BackupJob>, Error> {
        let span = info_span!("track_backup", request_id = %ctx.request_id(), backup_id = %backup_id);

        async move {
            let request =
                DaemonRequest::new(Operation::TrackBackup, Method::Get, &["backup", backup_id])
                    .with_query(self.contract.qualifier(blob_path));

            let seed = BackupJob {
                blob_path: blob_path.to_string(),
                ..Default::default()
            };

            self.fetch(ctx, request, seed).await
        }
        .instrument(span)
        .await
    }

    /// Returns `false` when the daemon has no such backup.
    pub async fn evict_backup(
        &self,
        ctx: &RequestContext,
        backup_id: &str,
        blob_path: &str,
    ) -> Result<bool, Error> {
        let span = info_span!("evict_backup", request_id = %ctx.request_id(), backup_id = %backup_id);

        async move {
            let request =
                DaemonRequest::new(Operation::EvictBackup, Method::Delete, &["backup", backup_id])
                    .with_query(self.contract.qualifier(blob_path));

            let evicted = self.exchange(ctx, request).await?.is_some();
            if evicted {
                info!("Backup evicted");
            }
            Ok::<_, Error>(evicted)
        }
        .instrument(span)
        .await
    }

    /// Restore databases from `backup_id` under freshly generated names.
    ///
    /// Names are generated before the daemon is contacted, so an invalid
    /// mapping never reaches it. `dry_run` is forwarded as-is.
    pub async fn submit_restore(
        &self,
        ctx: &RequestContext,
        backup_id: &str,
        request: &CreateRestoreRequest,
        dry_run: bool,
    ) -> Result<Option<RestoreJob>, Error> {
        let span = info_span!(
            "submit_restore",
            request_id = %ctx.request_id(),
            backup_id = %backup_id,
            dry_run,
        );

        async move {
            let mut daemon_databases = Vec::with_capacity(request.databases.len());
            let mut client_databases = Vec::with_capacity(request.databases.len());

            for mapping in &request.databases {
                let naming_failed = |source| {
                    logged(Error::NameGeneration {
                        operation: Operation::SubmitRestore,
                        request_id: ctx.request_id().to_string(),
                        database: mapping.database_name.clone(),
                        source,
                    })
                };
                let info = DbInfo::try_from(mapping).map_err(naming_failed)?;
                let new_name = self
                    .names
                    .generate_new_name(&info, false)
                    .map_err(naming_failed)?;

                debug!(previous = %mapping.database_name, new = %new_name, "Remapped database");

                daemon_databases.push(DaemonRestoreMapping {
                    previous_database_name: mapping.database_name.clone(),
                    database_name: new_name.clone(),
                });
                client_databases.push(LogicalDatabaseRestore {
                    microservice_name: Some(mapping.microservice_name.clone()),
                    namespace: Some(mapping.namespace.clone()),
                    prefix: info.prefix,
                    previous_database_name: Some(mapping.database_name.clone()),
                    database_name: new_name,
                    status: JobStatus::NotStarted,
                    ..Default::default()
                });
            }

            let daemon_request =
                DaemonRequest::new(Operation::SubmitRestore, Method::Post, &["restore", backup_id])
                    .with_query(self.contract.restore_query(dry_run))
                    .with_body(self.contract.restore_body(
                        &request.storage_name,
                        &request.blob_path,
                        &daemon_databases,
                        dry_run,
                    ));

            let seed = RestoreJob {
                status: JobStatus::NotStarted,
                storage_name: request.storage_name.clone(),
                blob_path: request.blob_path.clone(),
                databases: client_databases,
                ..Default::default()
            };

            let job = self.fetch(ctx, daemon_request, seed).await?;
            if let Some(job) = &job {
                info!(restore_id = %job.restore_id, databases = job.databases.len(), "Restore started");
            }
            Ok::<_, Error>(job)
        }
        .instrument(span)
        .await
    }

    pub async fn track_restore(
        &self,
        ctx: &RequestContext,
        restore_id: &str,
        blob_path: &str,
    ) -> Result<Option<RestoreJob>, Error> {
        let span =
            info_span!("track_restore", request_id = %ctx.request_id(), restore_id = %restore_id);

        async move {
            let request =
                DaemonRequest::new(Operation::TrackRestore, Method::Get, &["restore", restore_id])
                    .with_query(self.contract.qualifier(blob_path));

            let seed = RestoreJob {
                blob_path: blob_path.to_string(),
                ..Default::default()
            };

            self.fetch(ctx, request, seed).await
        }
        .instrument(span)
        .await
    }

    /// Returns `false` when the daemon has no such restore.
    pub async fn evict_restore(
        &self,
        ctx: &RequestContext,
        restore_id: &str,
        blob_path: &str,
    ) -> Result<bool, Error> {
        let span =
            info_span!("evict_restore", request_id = %ctx.request_id(), restore_id = %restore_id);

        async move {
            let request = DaemonRequest::new(
                Operation::EvictRestore,
                Method::Delete,
                &["restore", restore_id],
            )
            .with_query(self.contract.qualifier(blob_path));

            let evicted = self.exchange(ctx, request).await?.is_some();
            if evicted {
                info!("Restore evicted");
            }
            Ok::<_, Error>(evicted)
        }
        .instrument(span)
        .await
    }

    /// Send `request` and overlay a successful reply onto `seed`.
    async fn fetch<T>(
        &self,
        ctx: &RequestContext,
        request: DaemonRequest,
        seed: T,
    ) -> Result<Option<T>, Error>
    where
        T: Serialize + DeserializeOwned,
    {
        let operation = request.operation;
        let Some(body) = self.exchange(ctx, request).await? else {
            return Ok(None);
        };

        overlay(&seed, &body).map(Some).map_err(|source| {
            logged(Error::decode(operation, ctx.request_id(), &body, source))
        })
    }

    /// One daemon round trip. `Ok(None)` on 404, the body on 200/202.
    async fn exchange(
        &self,
        ctx: &RequestContext,
        request: DaemonRequest,
    ) -> Result<Option<Vec<u8>>, Error> {
        let operation = request.operation;
        debug!(body = ?request.body, query = ?request.query, "Sending request to backup daemon");

        let response = self.transport.send(ctx, request).await.map_err(logged)?;

        match response.status {
            STATUS_OK | STATUS_ACCEPTED => Ok(Some(response.body)),
            STATUS_NOT_FOUND => {
                warn!("Backup daemon responded with status: not found");
                Ok(None)
            }
            status => Err(logged(Error::Daemon {
                operation,
                request_id: ctx.request_id().to_string(),
                status,
                body: response.body_text(),
            })),
        }
    }
}

/// Record a failure once, at the point it is raised.
fn logged(err: Error) -> Error {
    error!(
        operation = %err.operation(),
        request_id = %err.request_id(),
        kind = ?err.kind(),
        error = %err,
        "Backup daemon call failed"
    );
    err
}
