//! REST endpoint handlers for the writer API.
//!
//! Every handler goes through the shared [`TurnEngine`] in [`AppState`], so
//! each request reconciles the turn before it reads or acts.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/api/register` | Register a nickname, sets the session cookie |
//! | `POST` | `/api/join_queue` | Queue for a turn |
//! | `POST` | `/api/leave_queue` | Leave the queue |
//! | `GET` | `/api/status` | Turn status snapshot |
//! | `POST` | `/api/update_draft` | Replace the holder's draft |
//! | `GET` | `/api/get_draft` | Current draft |
//! | `POST` | `/api/submit` | Submit the holder's entry |
//! | `GET` | `/api/feed` | Recent entries, newest first |
//! | `GET` | `/api/book` | All entries, oldest first |
//! | `GET` | `/api/entries` | Entries by `order` and `limit` |
//! | `GET` | `/api/myinfo` | The caller's id, nickname, and entry count |
//!
//! [`TurnEngine`]: continuum_core::TurnEngine

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::{Deserialize, Serialize};

use continuum_types::EntryOrder;

use crate::error::ApiError;
use crate::session::{session_cookie, Caller, MaybeCaller};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies and query parameters
// ---------------------------------------------------------------------------

/// Body of `POST /api/register`.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    /// Display name; surrounding whitespace is trimmed.
    #[serde(default)]
    pub nickname: String,
}

/// Body of `POST /api/update_draft` and `POST /api/submit`.
#[derive(Debug, Default, Deserialize)]
pub struct TextRequest {
    /// The draft or entry text.
    #[serde(default)]
    pub text: String,
}

/// Query parameters for `GET /api/entries`.
#[derive(Debug, Default, Deserialize)]
pub struct EntriesQuery {
    /// `asc` (default) or `desc`.
    pub order: Option<EntryOrder>,
    /// Maximum entries to return, capped at `feed.max_limit`.
    pub limit: Option<usize>,
}

/// A successful response: `{"ok": true, ...body}`.
#[derive(Debug, Serialize)]
struct Success<T> {
    ok: bool,
    #[serde(flatten)]
    body: T,
}

const fn success<T>(body: T) -> Json<Success<T>> {
    Json(Success { ok: true, body })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::InvalidBody(e.body_text()))
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the turn status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let status = state.engine.status(None).await?;
    let entry_count = state.engine.entry_count().await;
    let holder = status
        .current_nickname
        .as_deref()
        .map_or_else(|| String::from("nobody"), escape_html);
    let seconds = status.seconds_remaining;
    let queue_length = status.queue_length;
    let turn_number = status.turn_number;

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Continuum</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Continuum</h1>
    <p class="subtitle">One story, one writer at a time</p>

    <div>
        <div class="metric">
            <div class="label">Writing now</div>
            <div class="value">{holder}</div>
        </div>
        <div class="metric">
            <div class="label">Seconds left</div>
            <div class="value">{seconds}</div>
        </div>
        <div class="metric">
            <div class="label">Waiting</div>
            <div class="value">{queue_length}</div>
        </div>
        <div class="metric">
            <div class="label">Turns</div>
            <div class="value">{turn_number}</div>
        </div>
        <div class="metric">
            <div class="label">Entries</div>
            <div class="value">{entry_count}</div>
        </div>
    </div>

    <hr>

    <ul>
        <li>POST /api/register</li>
        <li>POST /api/join_queue</li>
        <li>POST /api/leave_queue</li>
        <li>GET /api/status</li>
        <li>POST /api/update_draft</li>
        <li>GET /api/get_draft</li>
        <li>POST /api/submit</li>
        <li>GET /api/feed</li>
        <li>GET /api/book</li>
        <li>GET /api/entries?order=asc&amp;limit=100</li>
        <li>GET /ws/events</li>
    </ul>
</body>
</html>"#
    )))
}

// ---------------------------------------------------------------------------
// Participants and the queue
// ---------------------------------------------------------------------------

/// Register a nickname and remember the new id in the session cookie.
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let participant = state.engine.register(&request.nickname).await?;

    Ok((
        [(SET_COOKIE, session_cookie(participant.id))],
        Json(serde_json::json!({
            "ok": true,
            "user_id": participant.id,
            "nickname": participant.nickname,
        })),
    ))
}

/// Queue the caller for a turn.
pub async fn join_queue(
    State(state): State<Arc<AppState>>,
    Caller(id): Caller,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.join(id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Remove the caller from the queue. Succeeds when not queued.
pub async fn leave_queue(
    State(state): State<Arc<AppState>>,
    Caller(id): Caller,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.leave(id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// The caller's id, nickname, and number of entries written, or nulls for
/// an unknown caller.
pub async fn myinfo(
    State(state): State<Arc<AppState>>,
    MaybeCaller(caller): MaybeCaller,
) -> impl IntoResponse {
    let participant = match caller {
        Some(id) => state.engine.participant(id).await,
        None => None,
    };
    let entry_count = match &participant {
        Some(p) => Some(state.engine.authored_count(p.id).await),
        None => None,
    };

    Json(serde_json::json!({
        "user_id": participant.as_ref().map(|p| p.id),
        "nickname": participant.as_ref().map(|p| p.nickname.as_str()),
        "entry_count": entry_count,
    }))
}

// ---------------------------------------------------------------------------
// Turn status, draft, submission
// ---------------------------------------------------------------------------

/// The turn status as seen by the caller.
pub async fn status(
    State(state): State<Arc<AppState>>,
    MaybeCaller(caller): MaybeCaller,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.engine.status(caller).await?;
    Ok(success(snapshot))
}

/// Replace the holder's draft.
pub async fn update_draft(
    State(state): State<Arc<AppState>>,
    Caller(id): Caller,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    state.engine.update_draft(id, &request.text).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// The current draft.
pub async fn get_draft(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let draft = state.engine.draft().await?;
    Ok(Json(serde_json::json!({ "ok": true, "draft": draft })))
}

/// Submit the holder's text as the next entry.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Caller(id): Caller,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let entry = state.engine.submit(id, &request.text).await?;
    Ok(Json(serde_json::json!({ "ok": true, "entry": entry })))
}

// ---------------------------------------------------------------------------
// Ledger reads
// ---------------------------------------------------------------------------

/// The most recent entries, newest first.
pub async fn feed(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries = state
        .engine
        .entries(EntryOrder::Desc, Some(state.feed.recent_limit))
        .await;
    Json(serde_json::json!({ "ok": true, "entries": entries }))
}

/// The whole story, oldest first.
pub async fn book(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries = state.engine.entries(EntryOrder::Asc, None).await;
    Json(serde_json::json!({ "ok": true, "entries": entries }))
}

/// Entries in the requested order.
///
/// # Query Parameters
///
/// - `order`: `asc` | `desc` (default: `asc`)
/// - `limit`: maximum entries (default and cap: `feed.max_limit`)
pub async fn entries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EntriesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;
    let order = params.order.unwrap_or_default();
    let limit = state.clamp_limit(params.limit);

    let entries = state.engine.entries(order, Some(limit)).await;
    Ok(Json(serde_json::json!({
        "ok": true,
        "count": entries.len(),
        "entries": entries,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Escape text for inclusion in HTML.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
