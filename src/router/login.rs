use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::router::Payload;
use crate::user::{CitizenProfile, Credentials, User};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub user: User,
    pub profile: Option<CitizenProfile>,
    pub token_type: String,
    pub token: String,
    pub expires_in: u64,
}

/// Handler to log in with email and password.
pub async fn handler(
    State(state): State<AppState>,
    Payload(body): Payload<Credentials>,
) -> Result<Json<Response>> {
    let session = state.credentials.authenticate(&body).await?;
    let token = state.token.create(&session.user)?;

    Ok(Json(Response {
        user: session.user,
        profile: session.profile,
        token_type: TOKEN_TYPE.to_owned(),
        token,
        expires_in: state.token.lifetime(),
    }))
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use super::*;
    use crate::user::{ProfileFields, Role};
    use crate::*;

    async fn seed(state: &AppState, email: &str, password: &str, role: Role) -> User {
        state
            .credentials
            .provision("Seeded User", email, password, role, None)
            .await
            .unwrap()
    }

    async fn login(app: Router, email: &str, password: &str) -> (StatusCode, Value) {
        let response = make_request(
            app,
            Method::POST,
            "/api/login",
            json!({ "email": email, "password": password }).to_string(),
            None,
        )
        .await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_login_administrator() {
        let (state, _) = router::state();
        seed(&state, "admin@healthbridge.gov", "admin123", Role::Administrator).await;
        let app = app(state.clone());

        let (status, body) = login(app.clone(), "admin@healthbridge.gov", "admin123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "administrator");
        assert!(body["user"].get("password_hash").is_none());
        assert!(body["profile"].is_null());

        let body: Response = serde_json::from_value(body).unwrap();
        assert_eq!(body.token_type, TOKEN_TYPE);
        assert_eq!(body.expires_in, state.token.lifetime());
        let claims = state.token.decode(&body.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), body.user.id);
        assert_eq!(claims.role, Role::Administrator);

        let (status, body) = login(app, "admin@healthbridge.gov", "wrongpass").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["title"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (state, _) = router::state();
        seed(&state, "citizen@example.com", "citizen123", Role::Citizen).await;
        let app = app(state);

        let wrong_password = login(app.clone(), "citizen@example.com", "nope").await;
        let unknown_email = login(app, "ghost@example.com", "citizen123").await;

        assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_email);
    }

    #[tokio::test]
    async fn test_login_email_is_case_sensitive() {
        let (state, _) = router::state();
        seed(&state, "citizen@example.com", "citizen123", Role::Citizen).await;
        let app = app(state);

        let (status, _) = login(app, "Citizen@Example.com", "citizen123").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_citizen_profile() {
        let (state, _) = router::state();
        seed(&state, "citizen@example.com", "citizen123", Role::Citizen).await;
        let profile = ProfileFields {
            phone: Some("555-0100".into()),
            gender: Some("Not specified".into()),
            ..Default::default()
        };
        state
            .credentials
            .provision("Kael Miranda", "kaelmiranda@example.com", "kael123", Role::Citizen, Some(&profile))
            .await
            .unwrap();
        let app = app(state);

        // No profile row is not an error.
        let (status, body) = login(app.clone(), "citizen@example.com", "citizen123").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["profile"].is_null());

        let (status, body) = login(app, "kaelmiranda@example.com", "kael123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["phone"], "555-0100");
        assert_eq!(body["profile"]["user_id"], body["user"]["id"]);
        assert!(body["profile"]["dob"].is_null());
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let (state, _) = router::state();
        let app = app(state);

        let (status, body) = login(app.clone(), "", "secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "email");

        let response = make_request(
            app,
            Method::POST,
            "/api/login",
            json!({ "email": "jane@example.com" }).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
