use axum::{
    extract::{Extension, Request},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::{bearer_token, verify_token, AuthError, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

/// The caller's session, if a bearer token was sent. Inserted on every request.
#[derive(Debug, Clone, Default)]
pub struct Session(pub Option<AuthUser>);

impl Session {
    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }

    pub fn require(&self) -> Result<&AuthUser, ApiError> {
        self.0.as_ref().ok_or_else(|| AuthError::Missing.into())
    }
}

/// Verifies an optional `Authorization: Bearer` header. No header means an
/// anonymous session; a bad token is rejected outright.
pub async fn session_middleware(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = match request.headers().get(AUTHORIZATION) {
        None => Session(None),
        Some(value) => {
            let header = value.to_str().map_err(|_| AuthError::Malformed)?;
            let claims = verify_token(bearer_token(header)?, &state.config.auth.jwt_secret).map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                e
            })?;
            Session(Some(AuthUser::from(claims)))
        }
    };
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
