//! Request handlers: parse, validate, call the orchestrator, map the outcome.

use axum::{
    Json,
    extract::{
        Extension, Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::API_VERSIONS;
use crate::context::AppContext;
use crate::core::{CreateBackupRequest, CreateRestoreRequest, Error};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 400 response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadRequestResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// 500 response body. Never carries daemon internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorResponse {
    pub error: String,
    pub request_id: String,
}

/// Correlation id of the current request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Deserialize)]
pub struct BlobPathQuery {
    #[serde(rename = "blobPath")]
    blob_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestoreQuery {
    #[serde(rename = "dryRun")]
    dry_run: Option<String>,
}

/// Takes the caller's `X-Request-Id` or assigns a UUIDv7, and echoes it back.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

pub async fn collect_backup(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path((api_version, app_name)): Path<(String, String)>,
    body: Result<Json<CreateBackupRequest>, JsonRejection>,
) -> Response {
    if let Err(response) = check_app(&ctx, &api_version, &app_name) {
        return response;
    }

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(request_id = %request_id, error = %rejection, "Failed to parse backup request");
            return bad_request(vec![rejection.body_text()]);
        }
    };
    let details = request.validate();
    if !details.is_empty() {
        warn!(request_id = %request_id, ?details, "Failed to validate backup request");
        return bad_request(details);
    }
    debug!(request_id = %request_id, ?request, "Backup request");

    let rctx = ctx.request(request_id);
    match ctx
        .orchestrator
        .submit_backup(
            &rctx,
            &request.storage_name,
            &request.blob_path,
            &request.database_names(),
        )
        .await
    {
        Ok(Some(job)) => (StatusCode::ACCEPTED, Json(job)).into_response(),
        Ok(None) => not_found("Database not found"),
        Err(err) => server_error(&err),
    }
}

pub async fn track_backup(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path((api_version, app_name, backup_id)): Path<(String, String, String)>,
    query: Result<Query<BlobPathQuery>, QueryRejection>,
) -> Response {
    if let Err(response) = check_app(&ctx, &api_version, &app_name) {
        return response;
    }
    let blob_path = match require_blob_path(&request_id, query) {
        Ok(blob_path) => blob_path,
        Err(response) => return response,
    };

    let rctx = ctx.request(request_id);
    match ctx
        .orchestrator
        .track_backup(&rctx, &backup_id, &blob_path)
        .await
    {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => not_found("Backup not found"),
        Err(err) => server_error(&err),
    }
}

pub async fn delete_backup(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path((api_version, app_name, backup_id)): Path<(String, String, String)>,
    query: Result<Query<BlobPathQuery>, QueryRejection>,
) -> Response {
    if let Err(response) = check_app(&ctx, &api_version, &app_name) {
        return response;
    }
    let blob_path = match require_blob_path(&request_id, query) {
        Ok(blob_path) => blob_path,
        Err(response) => return response,
    };

    let rctx = ctx.request(request_id);
    match ctx
        .orchestrator
        .evict_backup(&rctx, &backup_id, &blob_path)
        .await
    {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("Backup not found"),
        Err(err) => server_error(&err),
    }
}

pub async fn restore_backup(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path((api_version, app_name, backup_id)): Path<(String, String, String)>,
    query: Result<Query<RestoreQuery>, QueryRejection>,
    body: Result<Json<CreateRestoreRequest>, JsonRejection>,
) -> Response {
    if let Err(response) = check_app(&ctx, &api_version, &app_name) {
        return response;
    }

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return rejected_query(&request_id, rejection),
    };
    let dry_run = match query.dry_run.as_deref().map(parse_bool) {
        None => false,
        Some(Some(value)) => value,
        Some(None) => {
            return bad_request(vec![
                "query parameter 'dryRun' must be a boolean".to_string(),
            ]);
        }
    };

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(request_id = %request_id, error = %rejection, "Failed to parse restore request");
            return bad_request(vec![rejection.body_text()]);
        }
    };
    let details = request.validate();
    if !details.is_empty() {
        warn!(request_id = %request_id, ?details, "Failed to validate restore request");
        return bad_request(details);
    }
    debug!(request_id = %request_id, ?request, dry_run, "Restore request");

    let rctx = ctx.request(request_id);
    match ctx
        .orchestrator
        .submit_restore(&rctx, &backup_id, &request, dry_run)
        .await
    {
        Ok(Some(job)) => (StatusCode::ACCEPTED, Json(job)).into_response(),
        Ok(None) => not_found("Backup not found"),
        Err(err) => server_error(&err),
    }
}

pub async fn track_restore(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path((api_version, app_name, restore_id)): Path<(String, String, String)>,
    query: Result<Query<BlobPathQuery>, QueryRejection>,
) -> Response {
    if let Err(response) = check_app(&ctx, &api_version, &app_name) {
        return response;
    }
    let blob_path = match require_blob_path(&request_id, query) {
        Ok(blob_path) => blob_path,
        Err(response) => return response,
    };

    let rctx = ctx.request(request_id);
    match ctx
        .orchestrator
        .track_restore(&rctx, &restore_id, &blob_path)
        .await
    {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => not_found("Restore not found"),
        Err(err) => server_error(&err),
    }
}

pub async fn delete_restore(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path((api_version, app_name, restore_id)): Path<(String, String, String)>,
    query: Result<Query<BlobPathQuery>, QueryRejection>,
) -> Response {
    if let Err(response) = check_app(&ctx, &api_version, &app_name) {
        return response;
    }
    let blob_path = match require_blob_path(&request_id, query) {
        Ok(blob_path) => blob_path,
        Err(response) => return response,
    };

    let rctx = ctx.request(request_id);
    match ctx
        .orchestrator
        .evict_restore(&rctx, &restore_id, &blob_path)
        .await
    {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("Restore not found"),
        Err(err) => server_error(&err),
    }
}

fn check_app(ctx: &AppContext, api_version: &str, app_name: &str) -> Result<(), Response> {
    if !API_VERSIONS.contains(&api_version) {
        Err(not_found("Unknown API version"))
    } else if app_name != ctx.config.app_name {
        Err(not_found("Unknown application"))
    } else {
        Ok(())
    }
}

fn require_blob_path(
    request_id: &str,
    query: Result<Query<BlobPathQuery>, QueryRejection>,
) -> Result<String, Response> {
    let Query(query) = query.map_err(|rejection| rejected_query(request_id, rejection))?;
    match query.blob_path.as_deref().map(str::trim) {
        Some(blob_path) if !blob_path.is_empty() => Ok(blob_path.to_string()),
        _ => Err(bad_request(vec![
            "query parameter 'blobPath' is required".to_string(),
        ])),
    }
}

fn rejected_query(request_id: &str, rejection: QueryRejection) -> Response {
    warn!(request_id = %request_id, error = %rejection, "Failed to parse query parameters");
    bad_request(vec![rejection.body_text()])
}

/// Accepts the spellings Go's `strconv.ParseBool` does.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn bad_request(details: Vec<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(BadRequestResponse {
            error: "Invalid request parameters".to_string(),
            details,
        }),
    )
        .into_response()
}

fn not_found(message: &'static str) -> Response {
    debug!(reason = message, "Responding not found");
    (StatusCode::NOT_FOUND, message).into_response()
}

/// The orchestrator has already logged `err` with full context.
fn server_error(err: &Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ServerErrorResponse {
            error: "Internal server error".to_string(),
            request_id: err.request_id().to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_matches_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn blob_path_is_trimmed_and_required() {
        let query = |blob_path: Option<&str>| {
            Ok(Query(BlobPathQuery {
                blob_path: blob_path.map(Into::into),
            }))
        };

        let ok = require_blob_path("req-1", query(Some("  b1 ")));
        assert_eq!(ok.ok(), Some("b1".to_string()));

        let missing = require_blob_path("req-1", query(None)).unwrap_err();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let blank = require_blob_path("req-1", query(Some("   "))).unwrap_err();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    }
}
