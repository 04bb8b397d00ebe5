//! Middleware de autenticación JWT
//!
//! Extrae el token Bearer, lo verifica y deja el `Actor` en las extensiones
//! de la request para los handlers.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{models::Actor, state::AppState, utils::errors::AppError};

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthenticated("Authorization token required".to_string()))?;

    let actor: Actor = state.jwt.verify(token.trim())?;
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}
