/// Bearer authentication middleware
///
/// Validates the `Authorization: Bearer <token>` header with the auth service
/// on every request, then injects an [`AuthContext`] into the request
/// extensions. Handlers read it with `Extension<AuthContext>`.
///
/// There is no local session cache; revoking a token at the auth service
/// takes effect on the next request.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use shyft_shared::auth::context::{bearer_token, AuthContext};
use tracing::debug;

use crate::{app::AppState, error::ApiError};

/// Authentication middleware layer
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = bearer_token(header_value)?.to_string();
    let user = state.auth.get_user(&token).await?;

    debug!(user_id = %user.id, "Authenticated request");
    req.extensions_mut().insert(AuthContext::new(user, token));

    Ok(next.run(req).await)
}
