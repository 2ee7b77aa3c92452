use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};

use crate::user::Authenticated;
use crate::{AppState, ServerError};

const BEARER: &str = "Bearer ";

/// Custom middleware for session tokens.
pub async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let claims = state.token.decode(token)?;
    let session = state.credentials.session(claims.user_id()?).await?;

    req.extensions_mut().insert::<Authenticated>(session);
    Ok(next.run(req).await)
}

/// Handler returning the identity behind the session token.
pub async fn handler(Extension(session): Extension<Authenticated>) -> Json<Authenticated> {
    Json(session)
}
