//! In-memory [`AccountRepository`] used by tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Result, ServerError};
use crate::user::{
    AccountRepository, CitizenProfile, NewAccount, ProfileFields, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    citizens: Vec<CitizenProfile>,
}

#[derive(Default)]
pub struct MemoryAccountRepository {
    tables: Mutex<Tables>,
    latency: Option<Duration>,
}

impl MemoryAccountRepository {
    /// Delay every round-trip by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Default::default()
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.tables.lock().unwrap().users.clone()
    }

    pub fn citizens(&self) -> Vec<CitizenProfile> {
        self.tables.lock().unwrap().citizens.clone()
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        self.wait().await;
        Ok(self.tables.lock().unwrap().users.iter().any(|u| u.email == email))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.wait().await;
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.wait().await;
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_profile(&self, user_id: i64) -> Result<Option<CitizenProfile>> {
        self.wait().await;
        let tables = self.tables.lock().unwrap();
        Ok(tables.citizens.iter().find(|c| c.user_id == user_id).cloned())
    }

    async fn create(
        &self,
        account: &NewAccount,
        profile: Option<&ProfileFields>,
    ) -> Result<User> {
        self.wait().await;
        let mut tables = self.tables.lock().unwrap();

        if tables.users.iter().any(|u| u.email == account.email) {
            return Err(ServerError::Conflict);
        }

        let user = User {
            id: tables.users.len() as i64 + 1,
            name: account.name.clone(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            role: account.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());

        if let Some(profile) = profile {
            let id = tables.citizens.len() as i64 + 1;
            tables.citizens.push(CitizenProfile {
                id,
                user_id: user.id,
                dob: profile.dob,
                phone: profile.phone.clone(),
                address: profile.address.clone(),
                gender: profile.gender.clone(),
                created_at: user.created_at,
            });
        }

        Ok(user)
    }
}
