//! Request extractors

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use estate_shared::constants::ACTOR_HEADER;

use crate::state::AppState;

/// Who performs the request, from `X-Actor` or the configured default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| state.default_actor.to_string());
        Ok(Actor(actor))
    }
}
