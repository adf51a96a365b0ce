use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Reject callers that do not present the configured admin bearer token.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = &state.admin_token {
        let presented = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
        if presented != Some(expected.as_str()) {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}
