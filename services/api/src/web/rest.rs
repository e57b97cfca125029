//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    analyze_task::{admit_caller, analyze_process, AnalyzeRejection},
    middleware::Caller,
    protocol::{
        AnalyzeResponse, GrantResponse, HealthResponse, LinePositionPayload, MatchPayload,
        PageSourcePayload, QuotaExceededResponse, QuotaInfoPayload, QuotaStatusResponse,
    },
    state::AppState,
};
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use hafiz_core::domain::AudioClip;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use utoipa::OpenApi;
use uuid::Uuid;

const SERVICE_NAME: &str = "hafiz-ai";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        analyze_handler,
        grant_bonus_handler,
        quota_status_handler,
        health_handler,
    ),
    components(
        schemas(
            AnalyzeResponse,
            MatchPayload,
            PageSourcePayload,
            LinePositionPayload,
            QuotaInfoPayload,
            QuotaExceededResponse,
            GrantResponse,
            QuotaStatusResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "Hafiz AI API", description = "Recitation identification with page locators and daily quotas.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Identify a recited passage from an audio upload.
///
/// Accepts a multipart/form-data request whose `file` part carries the recording.
/// Every call counts against the caller's daily quota unless `x-premium` is set.
/// A missing or unreadable form is answered with an empty result set.
#[utoipa::path(
    post,
    path = "/analyze",
    request_body(content_type = "multipart/form-data", description = "The recitation audio (wav or mp3)."),
    responses(
        (status = 200, description = "Analysis finished; `results` may be empty", body = AnalyzeResponse),
        (status = 429, description = "Daily quota exhausted", body = QuotaExceededResponse)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Caller identity; anonymous when absent."),
        ("x-premium" = Option<bool>, Header, description = "Skips quota metering when true.")
    )
)]
pub async fn analyze_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let span = info_span!(
        "analyze",
        request_id = %Uuid::new_v4(),
        caller = %caller.identity
    );

    async move {
        let quota = match admit_caller(&app_state, &caller) {
            Ok(quota) => quota,
            Err(AnalyzeRejection::QuotaExhausted(info)) => {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(QuotaExceededResponse::new(info)),
                )
                    .into_response()
            }
        };

        let upload = match multipart {
            Ok(mut multipart) => read_audio_upload(&mut multipart).await,
            Err(e) => {
                warn!("Request is not a readable multipart form: {}", e);
                None
            }
        };

        let report = analyze_process(app_state, quota, upload).await;
        let response = AnalyzeResponse {
            results: report.results.into_iter().map(MatchPayload::from).collect(),
            quota_info: report.quota.into(),
            error: report.failure.map(|f| f.marker().to_string()),
        };
        (StatusCode::OK, Json(response)).into_response()
    }
    .instrument(span)
    .await
}

/// Give the caller one extra attempt for today.
#[utoipa::path(
    post,
    path = "/grant-bonus",
    responses(
        (status = 200, description = "Remaining attempts after the bonus", body = GrantResponse)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Caller identity; anonymous when absent.")
    )
)]
pub async fn grant_bonus_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Json<GrantResponse> {
    let status = app_state.quota.grant(&caller.identity);
    info!("Granted a bonus attempt to '{}'", caller.identity);
    Json(GrantResponse {
        remaining: status.remaining,
        limit: status.limit,
    })
}

/// Report the caller's remaining attempts without consuming one.
#[utoipa::path(
    get,
    path = "/quota-status",
    responses(
        (status = 200, description = "Current quota", body = QuotaStatusResponse)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Caller identity; anonymous when absent."),
        ("x-premium" = Option<bool>, Header, description = "Reported as unlimited when true.")
    )
)]
pub async fn quota_status_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Json<QuotaStatusResponse> {
    let mut status = app_state.quota.status(&caller.identity);
    if caller.premium {
        status.premium = true;
        status.remaining = None;
    }
    Json(status.into())
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

//=========================================================================================
// Upload Helpers
//=========================================================================================

/// Reads the audio part of the form. The `file` or `audio` field is preferred;
/// otherwise the first part that looks like a file is used. Read errors are
/// logged and treated as a missing upload.
async fn read_audio_upload(multipart: &mut Multipart) -> Option<AudioClip> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read multipart data: {}", e);
                return None;
            }
        };

        let is_audio_part = matches!(field.name(), Some("file") | Some("audio"))
            || field.file_name().is_some();
        if !is_audio_part {
            continue;
        }

        let mime_type = declared_mime_type(&field);
        return match field.bytes().await {
            Ok(bytes) => Some(AudioClip::new(bytes, mime_type)),
            Err(e) => {
                warn!("Failed to read file bytes: {}", e);
                None
            }
        };
    }
}

/// The part's content type, or a guess from the file extension when the client
/// sent a generic one.
fn declared_mime_type(field: &Field<'_>) -> String {
    let declared = field
        .content_type()
        .filter(|ct| !ct.eq_ignore_ascii_case("application/octet-stream"));
    if let Some(ct) = declared {
        return ct.to_string();
    }

    let extension = field
        .file_name()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
    .to_string()
}
