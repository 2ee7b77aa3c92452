//! Configuration manager for HealthBridge.

use std::env::var;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 4000;
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance. Used as token issuer.
    pub url: String,
    /// Listening port.
    pub port: u16,
    #[serde(skip_deserializing)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Postgres,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Argon2,
    /// Related to session token configuration.
    #[serde(skip_serializing)]
    pub token: Token,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "HealthBridge".into(),
            url: format!("localhost:{DEFAULT_PORT}"),
            port: DEFAULT_PORT,
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            postgres: Postgres::default(),
            argon2: Argon2::default(),
            token: Token::default(),
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: String,
    /// Username credential to connect.
    pub username: String,
    /// Password credential to connect.
    pub password: String,
    /// Maximum pool connections.
    pub pool_size: u32,
    /// Upper bound, in seconds, for one store round-trip.
    pub timeout: u64,
}

impl Default for Postgres {
    fn default() -> Self {
        Self {
            address: "localhost:5432".into(),
            database: "healthbridge".into(),
            username: "postgres".into(),
            password: "postgres".into(),
            pool_size: 10,
            timeout: 5,
        }
    }
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2 {
    /// Memory used while hashing, in KiB.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Session token configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Token {
    /// HMAC secret used to sign tokens.
    pub secret: String,
    /// Token lifetime in seconds.
    pub lifetime: u64,
    /// Expected `aud` claim.
    pub audience: String,
}

impl Default for Token {
    fn default() -> Self {
        Self {
            secret: String::default(),
            lifetime: 60 * 60, // 1 hour.
            audience: "healthbridge".into(),
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Instance version, taken from the crate.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location, then applies environment overrides.
    ///
    /// An explicit path that cannot be read falls back to defaults, never to
    /// the default location.
    pub fn read(self) -> Arc<Self> {
        let file_path = if self.path.as_os_str().is_empty() {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        } else {
            self.path.clone()
        };

        let config = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(mut config) => {
                    config.version = VERSION.to_owned();
                    config.path = file_path;
                    config
                },
                Err(err) => Self::error(&file_path, err),
            },
            Err(err) => Self::error(&file_path, err),
        };

        Arc::new(config.with_env())
    }

    /// Override values with environment variables, if set.
    pub fn with_env(mut self) -> Self {
        if let Some(port) = parse_var("PORT") {
            self.port = port;
        }

        let (mut host, mut port) = match self.postgres.address.rsplit_once(':') {
            Some((host, port)) => (host.to_owned(), port.to_owned()),
            None => (self.postgres.address.clone(), "5432".to_owned()),
        };
        if let Ok(value) = var("DB_HOST") {
            host = value;
        }
        if let Some(value) = parse_var::<u16>("DB_PORT") {
            port = value.to_string();
        }
        self.postgres.address = format!("{host}:{port}");

        if let Ok(user) = var("DB_USER") {
            self.postgres.username = user;
        }
        if let Ok(password) = var("DB_PASS") {
            self.postgres.password = password;
        }
        if let Ok(database) = var("DB_NAME") {
            self.postgres.database = database;
        }
        if let Some(pool_size) = parse_var("DB_POOL_SIZE") {
            self.postgres.pool_size = pool_size;
        }
        if let Ok(secret) = var("TOKEN_SECRET") {
            self.token.secret = secret;
        }

        self
    }

    /// Return a default configuration as fallback.
    fn error(path: &Path, err: impl std::error::Error) -> Self {
        tracing::warn!(error = %err, path = %path.display(), "cannot read configuration file, using defaults");
        Self::default()
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let value = var(key).ok()?;
    value
        .parse()
        .map_err(|err| {
            tracing::warn!(%key, error = %err, "ignoring invalid environment variable");
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_sections() {
        let yaml = r#"
name: Test
url: localhost
port: 8080
postgres:
  address: db:5433
  database: hb
  pool_size: 3
argon2:
  memory_cost: 1024
  iterations: 1
  parallelism: 1
  hash_length: 32
token:
  secret: s3cr3t
"#;
        let config: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.postgres.address, "db:5433");
        assert_eq!(config.postgres.pool_size, 3);
        assert_eq!(config.postgres.username, "postgres");
        assert_eq!(config.postgres.timeout, 5);
        assert_eq!(config.argon2.memory_cost, 1024);
        assert_eq!(config.token.secret, "s3cr3t");
        assert_eq!(config.token.lifetime, 3600);
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut config = Configuration::default();
        config.token.secret = "hidden".into();
        config.postgres.password = "hidden".into();

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hidden"));
        assert!(json.contains("HealthBridge"));
    }

    #[test]
    fn test_partial_argon2_section() {
        let yaml = r#"
port: 8080
argon2:
  iterations: 2
"#;
        let config: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.argon2.iterations, 2);
        assert_eq!(config.argon2.memory_cost, Argon2::default().memory_cost);
    }

    #[test]
    fn test_explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "name: Riverside Clinic\n").unwrap();

        let config = Configuration::default().path(path.clone()).read();
        assert_eq!(config.name, "Riverside Clinic");
        assert_eq!(config.path, path);
        assert_eq!(config.version(), VERSION);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Configuration::default()
            .path(dir.path().join("config.yaml"))
            .read();

        // Defaults, not `./config.yaml`.
        assert_eq!(config.path, PathBuf::default());
        assert_eq!(config.name, "HealthBridge");
        assert_eq!(config.version(), VERSION);
    }
}
