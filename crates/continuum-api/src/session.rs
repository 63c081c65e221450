//! Caller identity for each request.
//!
//! The participant id travels in the `x-participant-id` header or in the
//! `continuum_participant` cookie that `POST /api/register` sets. Identity
//! is trusted as given; a missing or malformed id means "not registered".

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use continuum_core::TurnError;
use continuum_types::ParticipantId;

use crate::error::ApiError;

/// Header carrying the participant id.
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

/// Cookie carrying the participant id.
pub const SESSION_COOKIE: &str = "continuum_participant";

/// One year, in seconds.
const COOKIE_MAX_AGE: u64 = 31_536_000;

/// An identified caller. Rejects with `NotRegistered` when no id is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub ParticipantId);

/// A caller who may or may not be identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeCaller(pub Option<ParticipantId>);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_id(&parts.headers)
            .map(Self)
            .ok_or_else(|| ApiError::from(TurnError::NotRegistered))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeCaller {
    type Rejection = core::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(caller_id(&parts.headers)))
    }
}

/// The participant id in `headers`, header first, then cookie.
pub fn caller_id(headers: &HeaderMap) -> Option<ParticipantId> {
    if let Some(id) = headers
        .get(PARTICIPANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
    {
        return Some(id);
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.parse().ok())
}

/// The `Set-Cookie` value that remembers `id`.
pub fn session_cookie(id: ParticipantId) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={COOKIE_MAX_AGE}")
}
