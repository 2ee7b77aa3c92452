use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use validator::Validate;
use zeroize::Zeroizing;

use crate::crypto::PasswordManager;
use crate::error::{Result, ServerError};
use crate::user::{
    AccountRepository, Authenticated, Credentials, NewAccount, PasswordHash,
    ProfileFields, Registration, Role, User,
};

/// Registers and authenticates accounts.
#[derive(Clone)]
pub struct CredentialService {
    repo: Arc<dyn AccountRepository>,
    pwd: Arc<PasswordManager>,
    timeout: Duration,
}

impl CredentialService {
    /// Create a new [`CredentialService`].
    ///
    /// `timeout` bounds every store round-trip.
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        pwd: Arc<PasswordManager>,
        timeout: Duration,
    ) -> Self {
        Self { repo, pwd, timeout }
    }

    /// Self-register a citizen.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        registration.validate()?;

        if self
            .bounded(self.repo.exists_by_email(&registration.email))
            .await?
        {
            return Err(ServerError::Conflict);
        }

        let user = self
            .provision(
                &registration.name,
                &registration.email,
                &registration.password,
                Role::Citizen,
                Some(&registration.profile()),
            )
            .await?;

        tracing::info!(user_id = user.id, "citizen registered");
        metrics::counter!("accounts_created_total", "role" => user.role.as_str())
            .increment(1);

        Ok(user)
    }

    /// Hash `password` and store a new account with an optional profile.
    ///
    /// The store's unique constraint on email is the final authority: a
    /// concurrent duplicate is [`ServerError::Conflict`].
    pub async fn provision(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        profile: Option<&ProfileFields>,
    ) -> Result<User> {
        let account = NewAccount {
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash: self.hash(password).await?,
            role,
        };

        self.bounded(self.repo.create(&account, profile)).await
    }

    /// Check credentials.
    ///
    /// An unknown email and a wrong password both yield
    /// [`ServerError::InvalidCredentials`] after the same amount of hashing.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Authenticated> {
        credentials.validate()?;

        let account = self
            .bounded(self.repo.find_by_email(&credentials.email))
            .await?;
        let verified = self
            .verify(
                &credentials.password,
                account.as_ref().map(|user| &user.password_hash),
            )
            .await?;

        let user = match account {
            Some(user) if verified => user,
            _ => {
                tracing::info!("login rejected");
                metrics::counter!("auth_attempts_total", "outcome" => "failure")
                    .increment(1);
                return Err(ServerError::InvalidCredentials);
            },
        };

        tracing::info!(user_id = user.id, role = user.role.as_str(), "login succeeded");
        metrics::counter!("auth_attempts_total", "outcome" => "success").increment(1);

        self.with_profile(user).await
    }

    /// Load the identity behind a session token subject.
    pub async fn session(&self, user_id: i64) -> Result<Authenticated> {
        match self.bounded(self.repo.find_by_id(user_id)).await? {
            Some(user) => self.with_profile(user).await,
            None => Err(ServerError::Unauthorized),
        }
    }

    async fn with_profile(&self, user: User) -> Result<Authenticated> {
        let profile = match user.role {
            Role::Citizen => self.bounded(self.repo.find_profile(user.id)).await?,
            Role::Administrator => None,
        };

        Ok(Authenticated { user, profile })
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ServerError::Timeout)?
    }

    async fn hash(&self, password: &str) -> Result<PasswordHash> {
        let pwd = Arc::clone(&self.pwd);
        let password = Zeroizing::new(password.to_owned());

        let phc = tokio::task::spawn_blocking(move || pwd.hash_password(password.as_bytes()))
            .await
            .map_err(|err| ServerError::internal("password hashing task failed", err))??;

        Ok(PasswordHash::from(phc))
    }

    async fn verify(&self, password: &str, hash: Option<&PasswordHash>) -> Result<bool> {
        let pwd = Arc::clone(&self.pwd);
        let password = Zeroizing::new(password.to_owned());
        let hash = hash.map(|hash| hash.as_str().to_owned());

        let verified = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => pwd.verify_password(password.as_bytes(), &hash),
            None => {
                pwd.verify_dummy(password.as_bytes());
                Ok(false)
            },
        })
        .await
        .map_err(|err| ServerError::internal("password verification task failed", err))??;

        Ok(verified)
    }
}
