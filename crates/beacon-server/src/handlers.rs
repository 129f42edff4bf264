use crate::auth::AuthSession;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use beacon_core::{LeadDraft, SentEmail};
use beacon_mail::OutgoingMail;
use beacon_store::upsert_lead;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// 1x1 transparent GIF, base64; served verbatim on every tracking hit.
const TRACKING_PIXEL_BASE64: &str = "R0lGODlhAQABAIAAAAAAAP///ywAAAAAAQABAAACAUwAOw==";

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

fn internal(message: &str, details: String) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message, "details": details })),
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Server-side credential check; hands out the bearer token the rest of the
/// operator endpoints require.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let auth = &state.config.auth;
    if auth.password.is_empty() {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Operator credentials are not configured" })),
        ));
    }

    if request.username != auth.username || request.password != auth.password {
        tracing::warn!("rejected login attempt");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid username or password." })),
        ));
    }

    let token = state.sessions.issue().await;
    Ok(Json(json!({ "success": true, "token": token })))
}

/// Full inbox fetch: one IMAP round trip, normalized and ordered
/// unread-first. Batch-level failures surface as 500 with details.
pub async fn get_emails(
    _session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    match state.mail.fetch_inbox().await {
        Ok(messages) => {
            tracing::info!(total = messages.len(), "inbox fetch completed");
            Ok(Json(json!(messages)))
        }
        Err(err) => {
            tracing::error!("inbox fetch failed: {err}");
            Err(internal("Failed to fetch emails", err.to_string()))
        }
    }
}

pub async fn get_sent_emails(
    _session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    match state.sent_mail.list_sent().await {
        Ok(records) => Ok(Json(json!(records))),
        Err(err) => {
            tracing::error!("sent mail listing failed: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch emails" })),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

pub async fn get_email_by_id(
    _session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(id) = query.id.filter(|id| !id.is_empty()) else {
        return Err(bad_request("Missing email ID"));
    };

    match state.sent_mail.get_sent(&id).await {
        Ok(Some(record)) => Ok(Json(json!(record))),
        Ok(None) => Err(not_found("Email not found")),
        Err(err) => {
            tracing::error!(%id, "sent mail lookup failed: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch email" })),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub message: String,
}

/// Send one tracked message: verify + deliver over SMTP, then persist the
/// sent record keyed by the pixel identifier with `isSeen = false`.
pub async fn send_email(
    _session: AuthSession,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.to.trim().is_empty()
        || request.subject.trim().is_empty()
        || request.message.trim().is_empty()
    {
        return Err(bad_request("All fields are required!"));
    }
    if !is_valid_email(request.to.trim()) {
        return Err(bad_request("Invalid recipient address"));
    }

    let email_id = Uuid::new_v4().to_string();
    let pixel_url =
        beacon_mail::tracking_pixel_url(&state.config.server.public_base_url, &email_id);
    let html = beacon_mail::compose_html(&request.message, state.mail.from_name(), &pixel_url);

    let outgoing = OutgoingMail {
        to: request.to.trim().to_string(),
        subject: request.subject.clone(),
        message: request.message.clone(),
    };

    if let Err(err) = state.mail.send(&outgoing, &html).await {
        tracing::error!(to = %outgoing.to, "send failed: {err}");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": err.to_string() })),
        ));
    }

    let record = SentEmail {
        id: email_id,
        to: outgoing.to.clone(),
        subject: outgoing.subject.clone(),
        message: request.message,
        sent_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        is_seen: false,
    };
    state.sent_mail.record_sent(&record).await.map_err(|err| {
        tracing::error!(id = %record.id, "failed to persist sent record: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": err.to_string() })),
        )
    })?;

    tracing::info!(id = %record.id, to = %record.to, "email sent and logged");
    Ok(Json(
        json!({ "success": true, "message": "Email sent and logged." }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackOpenQuery {
    pub email_id: Option<String>,
}

/// Tracking pixel hit. The record update is best effort: the pixel is served
/// no matter what happened to the record, so a recipient's client never sees
/// an error image.
pub async fn track_open(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrackOpenQuery>,
) -> Response {
    let Some(email_id) = query.email_id.filter(|id| !id.is_empty()) else {
        return bad_request("Missing email ID").into_response();
    };

    match state.sent_mail.mark_seen(&email_id).await {
        Ok(true) => tracing::info!(%email_id, "tracked mail open"),
        Ok(false) => tracing::warn!(%email_id, "tracking hit for unknown sent record"),
        Err(err) => tracing::error!(%email_id, "seen-status update failed: {err}"),
    }

    tracking_pixel_response()
}

fn tracking_pixel_response() -> Response {
    let pixel = STANDARD
        .decode(TRACKING_PIXEL_BASE64)
        .expect("valid tracking pixel constant");

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, proxy-revalidate",
            ),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        pixel,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSeenRequest {
    pub email_id: String,
}

/// Manual seen-marking for the sent view.
pub async fn update_seen(
    _session: AuthSession,
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateSeenRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.email_id.is_empty() {
        return Err(bad_request("Email ID required"));
    }

    match state.sent_mail.mark_seen(&request.email_id).await {
        Ok(true) => Ok(Json(
            json!({ "success": true, "message": "Email marked as seen" }),
        )),
        Ok(false) => Err(not_found("Email not found")),
        Err(err) => {
            tracing::error!(email_id = %request.email_id, "seen-status update failed: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Failed to update email status" })),
            ))
        }
    }
}

/// Upsert a lead keyed case-insensitively by email.
pub async fn add_lead(
    _session: AuthSession,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<LeadDraft>,
) -> Result<Json<Value>, ApiError> {
    if draft.name.trim().is_empty() || draft.email.trim().is_empty() || draft.phone.trim().is_empty()
    {
        return Err(bad_request("Missing required fields"));
    }
    if !is_valid_email(draft.email.trim()) {
        return Err(bad_request("Invalid email format"));
    }

    match upsert_lead(state.leads.as_ref(), &draft).await {
        Ok((lead, true)) => Ok(Json(json!({
            "success": true,
            "message": format!(
                "Email {} already exists. Lead information has been updated.",
                lead.email
            ),
            "lead": lead,
            "isUpdate": true,
        }))),
        Ok((lead, false)) => Ok(Json(json!({
            "success": true,
            "message": "New lead added successfully!",
            "lead": lead,
            "isUpdate": false,
        }))),
        Err(err) => {
            tracing::error!("lead upsert failed: {err}");
            Err(internal("Failed to add/update lead", err.to_string()))
        }
    }
}

pub async fn get_leads(
    _session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    match state.leads.list().await {
        Ok(leads) => Ok(Json(json!(leads))),
        Err(err) => {
            tracing::error!("lead listing failed: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch leads" })),
            ))
        }
    }
}

/// Same address shape the dashboard has always accepted.
fn is_valid_email(email: &str) -> bool {
    let pattern = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex");
    pattern.is_match(email)
}
