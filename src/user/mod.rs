mod repository;
mod service;

#[cfg(test)]
mod memory;

pub use repository::*;
pub use service::*;

#[cfg(test)]
pub use memory::MemoryAccountRepository;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use zeroize::{Zeroize, ZeroizeOnDrop};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Account role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Citizen,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Administrator => "administrator",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "citizen" => Ok(Role::Citizen),
            "administrator" => Ok(Role::Administrator),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// Salted Argon2id verifier in PHC format.
#[derive(Clone, Default, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PasswordHash {
    fn from(phc: String) -> Self {
        Self(phc)
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHash")
            .field("phc_string", &"[REDACTED]")
            .finish()
    }
}

/// User as saved on database. Serializes to the public user record.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: PasswordHash,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Demographic extension of a citizen [`User`].
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct CitizenProfile {
    pub id: i64,
    pub user_id: i64,
    pub dob: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Optional profile fields, already normalized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileFields {
    pub dob: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
}

/// Account about to be inserted.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub role: Role,
}

/// Authenticated identity with its profile, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Authenticated {
    pub user: User,
    pub profile: Option<CitizenProfile>,
}

/// Self-registration request.
///
/// Absent or `null` fields deserialize as empty so that they fail validation
/// the same way empty ones do.
#[derive(Clone, Default, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct Registration {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, max = 255, message = "Name is required."))]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, max = 255, message = "Email is required."))]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[validate(custom(
        function = "validate_dob",
        message = "Date of birth must be formatted as YYYY-MM-DD."
    ))]
    pub dob: Option<String>,
    #[validate(length(max = 32, message = "Phone must be at most 32 characters."))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 32, message = "Gender must be at most 32 characters."))]
    pub gender: Option<String>,
}

impl Registration {
    /// Optional fields with blanks turned into `None`.
    pub fn profile(&self) -> ProfileFields {
        ProfileFields {
            dob: non_blank(&self.dob)
                .and_then(|dob| NaiveDate::parse_from_str(&dob, DATE_FORMAT).ok()),
            phone: non_blank(&self.phone),
            address: non_blank(&self.address),
            gender: non_blank(&self.gender),
        }
    }
}

/// Login request.
#[derive(Clone, Default, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "Email is required."))]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn validate_dob(dob: &str) -> Result<(), ValidationError> {
    let dob = dob.trim();
    if dob.is_empty() || NaiveDate::parse_from_str(dob, DATE_FORMAT).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("dob"))
    }
}
