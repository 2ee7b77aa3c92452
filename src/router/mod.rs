pub mod login;
pub mod me;
pub mod signup;
pub mod status;

use axum::extract::FromRequest;
use axum::routing::{get, post};
use axum::{Router, middleware};

use crate::{AppState, ServerError};

/// JSON body whose rejections are rendered as [`ServerError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct Payload<T>(pub T);

/// Routes mounted under `/api`.
pub fn api(state: AppState) -> Router<AppState> {
    let session = Router::new()
        // `GET /api/me` goes to `me`. Session token required.
        .route("/me", get(me::handler))
        .route_layer(middleware::from_fn_with_state(state, me::auth));

    Router::new()
        // `POST /api/signup` goes to `signup`.
        .route("/signup", post(signup::handler))
        // `POST /api/login` goes to `login`.
        .route("/login", post(login::handler))
        .merge(session)
}

#[cfg(test)]
pub(crate) fn state() -> (AppState, std::sync::Arc<crate::user::MemoryAccountRepository>) {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::Configuration;
    use crate::crypto::{PasswordManager, test_config};
    use crate::token::TokenManager;
    use crate::user::{CredentialService, MemoryAccountRepository};

    let mut config = Configuration::default();
    config.token.secret = "test-secret".into();
    let config = Arc::new(config);

    let repo = Arc::new(MemoryAccountRepository::default());
    let pwd = Arc::new(PasswordManager::new(&test_config()).expect("argon2 params"));
    let credentials =
        CredentialService::new(repo.clone(), pwd, Duration::from_secs(5));
    let token = TokenManager::new(&config.url, &config.token).expect("token secret");

    (
        AppState {
            config,
            credentials,
            token,
            metrics: None,
        },
        repo,
    )
}
