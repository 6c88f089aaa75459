//! Voice catalog endpoint

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::engine::{describe_engine, language_description, VOICES};
use crate::server::types::{ErrorResponse, VoiceInfo, VoicesResponse};

/// GET /api/voices/:engine
///
/// Catalog engines return their bundled voices; cloning engines return an
/// empty list with `requires_reference` set so the client asks for a
/// sample instead.
pub async fn list(Path(engine): Path<String>) -> Response {
    let info = match describe_engine(&engine) {
        Ok(info) => info,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    if info.requires_reference {
        return Json(VoicesResponse {
            voices: Vec::new(),
            requires_reference: true,
        })
        .into_response();
    }

    let voices = VOICES
        .iter()
        .map(|id| VoiceInfo {
            id: id.to_string(),
            name: display_name(id),
            language: id
                .chars()
                .next()
                .and_then(language_description)
                .map(str::to_string),
        })
        .collect();
    Json(VoicesResponse {
        voices,
        requires_reference: false,
    })
    .into_response()
}

/// `af_heart` -> `Heart (AF)`: readable name keeping the catalog prefix.
fn display_name(id: &str) -> String {
    match id.split_once('_') {
        Some((prefix, rest)) => {
            let mut chars = rest.chars();
            let name = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            };
            format!("{} ({})", name, prefix.to_uppercase())
        }
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("af_heart"), "Heart (AF)");
        assert_eq!(display_name("bm_george"), "George (BM)");
        assert_eq!(display_name("plain"), "plain");
    }
}
