//! Server configuration and start-up helpers for the `care-server` binary.

use std::path::{Path, PathBuf};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use care_core::{
  actor::{NewUser, Role, UserAccount},
  store::CareStore,
};
use rand_core::OsRng;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Server configuration, loaded from `config.toml` and `CARE_*` environment
/// variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                    String,
  #[serde(default = "default_port")]
  pub port:                    u16,
  pub store_path:              PathBuf,
  /// When both bootstrap fields are set, a superuser with these credentials
  /// is created on start-up unless the username is already taken.
  #[serde(default)]
  pub bootstrap_username:      Option<String>,
  #[serde(default)]
  pub bootstrap_password_hash: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8000 }

impl ServerConfig {
  /// Layer the TOML file at `path` (optional) under `CARE_*` environment
  /// variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CARE"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Hash `password` into an argon2 PHC string with default parameters.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

/// Create the configured bootstrap superuser if it does not exist yet.
///
/// Returns the account when one was created.
pub async fn bootstrap_superuser<S>(
  store: &S,
  config: &ServerConfig,
) -> Result<Option<UserAccount>, S::Error>
where
  S: CareStore,
{
  let (Some(username), Some(password_hash)) =
    (&config.bootstrap_username, &config.bootstrap_password_hash)
  else {
    return Ok(None);
  };

  if store.find_user(username).await?.is_some() {
    tracing::debug!(%username, "bootstrap user already present");
    return Ok(None);
  }

  let account = store
    .add_user(NewUser {
      username:      username.clone(),
      password_hash: password_hash.clone(),
      role:          Role::StateAdmin,
      is_superuser:  true,
      state_id:      None,
      district_id:   None,
    })
    .await?;
  tracing::info!(%username, id = account.id, "created bootstrap superuser");
  Ok(Some(account))
}

#[cfg(test)]
mod tests {
  use care_store_sqlite::SqliteStore;

  use super::*;

  fn config(username: Option<&str>) -> ServerConfig {
    ServerConfig {
      host:                    default_host(),
      port:                    default_port(),
      store_path:              PathBuf::from(":memory:"),
      bootstrap_username:      username.map(str::to_owned),
      bootstrap_password_hash: Some("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".into()),
    }
  }

  #[tokio::test]
  async fn creates_superuser_once() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = config(Some("admin"));

    let created = bootstrap_superuser(&store, &cfg).await.unwrap().unwrap();
    assert!(created.is_superuser);
    assert_eq!(created.username, "admin");

    assert!(bootstrap_superuser(&store, &cfg).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn no_bootstrap_without_username() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(bootstrap_superuser(&store, &config(None)).await.unwrap().is_none());
    assert!(store.find_user("admin").await.unwrap().is_none());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/care.db")), PathBuf::from(home).join("care.db"));
    assert_eq!(expand_tilde(Path::new("/var/care.db")), PathBuf::from("/var/care.db"));
  }

  #[test]
  fn loads_toml_with_defaults() {
    let path = std::env::temp_dir().join(format!("care-server-{}.toml", std::process::id()));
    std::fs::write(&path, "store_path = \"/tmp/care.db\"\nport = 9100\n").unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/care.db"));
    assert!(cfg.bootstrap_username.is_none());
  }

  #[test]
  fn hashed_password_verifies() {
    use argon2::{PasswordHash, PasswordVerifier};

    let phc = hash_password("hunter2").unwrap();
    let parsed = PasswordHash::new(&phc).unwrap();
    assert!(Argon2::default().verify_password(b"hunter2", &parsed).is_ok());
    assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
  }

  #[test]
  fn address_joins_host_and_port() {
    assert_eq!(config(None).address(), "127.0.0.1:8000");
  }
}
