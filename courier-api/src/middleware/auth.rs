use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use courier_shared::{Caller, Role};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Bearer token claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller::new(claims.sub, claims.role)
    }
}

/// Resolves the bearer token into a `Caller` extension. Handlers behind this
/// layer can rely on `Extension<Caller>` being present.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token.".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token.".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::AuthenticationError("Invalid or expired token.".to_string())
    })?;

    req.extensions_mut().insert(Caller::from(token_data.claims));

    Ok(next.run(req).await)
}
