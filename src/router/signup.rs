use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::router::Payload;
use crate::user::{Registration, User};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub user: User,
}

/// Handler to register a citizen.
pub async fn handler(
    State(state): State<AppState>,
    Payload(body): Payload<Registration>,
) -> Result<(StatusCode, Json<Response>)> {
    let user = state.credentials.register(&body).await?;

    Ok((StatusCode::CREATED, Json(Response { user })))
}
