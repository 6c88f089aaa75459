//! Voice profile endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::engine::VoiceFormula;
use crate::server::server_core::ServerState;
use crate::server::types::{ErrorResponse, ProfilesResponse, VoiceProfile};

/// GET /api/voice-profiles
pub async fn list(State(state): State<Arc<ServerState>>) -> Json<ProfilesResponse> {
    Json(ProfilesResponse {
        profiles: state.profiles.list(),
    })
}

/// POST /api/voice-profiles
///
/// Validates the formula before saving so the store never holds a mix the
/// catalog engine would reject at synthesis time.
pub async fn save(
    State(state): State<Arc<ServerState>>,
    Json(profile): Json<VoiceProfile>,
) -> Response {
    if profile.name.trim().is_empty() {
        return bad_request("profile name must not be empty");
    }
    let formula = match VoiceFormula::parse(&profile.formula) {
        Some(formula) => formula,
        None => return bad_request("formula is not a valid weighted voice expression"),
    };
    if let Some(unknown) = formula.unknown_voice() {
        return bad_request(&format!("unknown voice '{}' in formula", unknown));
    }

    match state.profiles.save(&profile.name, &profile.formula) {
        Ok(()) => Json(profile).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// DELETE /api/voice-profiles/:name
pub async fn remove(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.profiles.delete(&name) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no voice profile named '{}'", name),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
