//! Open one storage session per request from the state's session provider.

use crate::error::AppError;
use crate::state::AppState;
use crate::store::Session;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Request-scoped session. Dropped with the request; uncommitted work is rolled back.
pub struct DbSession(pub Box<dyn Session>);

#[async_trait]
impl FromRequestParts<AppState> for DbSession {
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = state.sessions.session().await?;
        Ok(DbSession(session))
    }
}
