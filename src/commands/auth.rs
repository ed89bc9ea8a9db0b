//! Account commands.
//!
//! The identity provider lives in-process, so the account a command signs in
//! is remembered by writing its `user_id` and `email` to the config file.

use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use liftsync_core::{AuthSession, AuthState, MemoryIdentity, RemoteStore, User};

use crate::config::Config;

#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand)]
enum AuthSubcommand {
    /// Create an account and sign it in
    Register {
        /// Email address
        email: String,
    },
    /// Sign in as an account stored on this device
    Login {
        /// User ID
        user_id: String,
    },
    /// Sign out (remove user_id and email from config)
    Logout,
    /// Show authentication status
    Status,
}

const USER_KEYS: [&str; 2] = ["user_id", "email"];

impl AuthCommand {
    pub async fn run(
        &self,
        store: Arc<dyn RemoteStore>,
        config: &Config,
        config_path: PathBuf,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AuthSubcommand::Register { email } => {
                let password = prompt("Choose a password: ")?;
                let user = register(store, email, &password, &config_path).await?;
                println!("Registered {} (user id {})", user.email, user.id);
            }
            AuthSubcommand::Login { user_id } => {
                let user = login(store, user_id, &config_path).await?;
                println!("Signed in as {}", user.email);
            }
            AuthSubcommand::Logout => {
                if logout(&config_path)? {
                    println!("Signed out. Plans stay on this device until you sign in again.");
                } else {
                    println!("Already signed out.");
                }
            }
            AuthSubcommand::Status => match status(store, config).await {
                AuthState::Authenticated(user) => {
                    println!("Signed in as {} (user id {})", user.email, user.id);
                }
                AuthState::Error(reason) => println!("Signed in, but {}", reason),
                AuthState::Unauthenticated | AuthState::Loading => {
                    println!("Not signed in. Run 'liftsync auth register' to create an account.");
                }
            },
        }
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String, Box<dyn std::error::Error>> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Creates the account with its user document and records it in the config.
async fn register(
    store: Arc<dyn RemoteStore>,
    email: &str,
    password: &str,
    config_path: &Path,
) -> Result<User, Box<dyn std::error::Error>> {
    let session = AuthSession::new(Arc::new(MemoryIdentity::new()), store);
    let user = session.register(email, password).await?;
    save_user(&user, config_path)?;
    Ok(user)
}

/// Signs in as `user_id` if its user document exists.
async fn login(
    store: Arc<dyn RemoteStore>,
    user_id: &str,
    config_path: &Path,
) -> Result<User, Box<dyn std::error::Error>> {
    let session = AuthSession::new(Arc::new(MemoryIdentity::signed_in(user_id)), store);
    match session.restore().await {
        AuthState::Authenticated(user) => {
            save_user(&user, config_path)?;
            Ok(user)
        }
        AuthState::Error(reason) => {
            Err(format!("Cannot sign in as {}: {}", user_id, reason).into())
        }
        _ => Err(format!("Cannot sign in as {}", user_id).into()),
    }
}

async fn status(store: Arc<dyn RemoteStore>, config: &Config) -> AuthState {
    let identity = match &config.user_id.value {
        Some(user_id) => MemoryIdentity::signed_in(user_id.as_str()),
        None => MemoryIdentity::new(),
    };
    AuthSession::new(Arc::new(identity), store).restore().await
}

fn read_yaml(config_path: &Path) -> Result<serde_yaml::Value, Box<dyn std::error::Error>> {
    if !config_path.exists() {
        return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }
    let contents = std::fs::read_to_string(config_path)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
    match value {
        // An empty or comment-only file parses as null.
        serde_yaml::Value::Null => Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new())),
        value => Ok(value),
    }
}

fn write_yaml(
    config_path: &Path,
    value: &serde_yaml::Value,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, serde_yaml::to_string(value)?)?;
    Ok(())
}

fn save_user(user: &User, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut yaml = read_yaml(config_path)?;
    let mapping = yaml.as_mapping_mut().ok_or("Invalid config format")?;
    mapping.insert("user_id".into(), user.id.as_str().into());
    mapping.insert("email".into(), user.email.as_str().into());
    write_yaml(config_path, &yaml)
}

/// Removes the signed-in account from the config. Returns whether one was set.
fn logout(config_path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    if !config_path.exists() {
        return Ok(false);
    }
    let mut yaml = read_yaml(config_path)?;
    let mapping = yaml.as_mapping_mut().ok_or("Invalid config format")?;
    let mut removed = false;
    for key in USER_KEYS {
        removed |= mapping
            .remove(serde_yaml::Value::String(key.to_string()))
            .is_some();
    }
    if removed {
        write_yaml(config_path, &yaml)?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftsync_core::MemoryStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_register_then_status_and_logout() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "item_height: 64.0\n").unwrap();
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());

        let user = register(Arc::clone(&store), "lifter@example.com", "secret", &config_path)
            .await
            .unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.user_id.value.as_deref(), Some(user.id.as_str()));
        assert_eq!(config.email.value.as_deref(), Some("lifter@example.com"));
        assert_eq!(config.item_height.value, 64.0);
        assert_eq!(
            status(Arc::clone(&store), &config).await,
            AuthState::Authenticated(user.clone())
        );

        assert!(logout(&config_path).unwrap());
        assert!(!logout(&config_path).unwrap());
        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.user_id.value, None);
        assert_eq!(config.item_height.value, 64.0);
        assert_eq!(status(store, &config).await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_requires_user_document() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());

        assert!(login(Arc::clone(&store), "ghost", &config_path).await.is_err());
        assert!(!config_path.exists());

        let user = register(Arc::clone(&store), "a@example.com", "pw", &config_path)
            .await
            .unwrap();
        logout(&config_path).unwrap();

        let signed_in = login(store, &user.id, &config_path).await.unwrap();
        assert_eq!(signed_in.email, "a@example.com");
        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.user_id.value.as_deref(), Some(user.id.as_str()));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_password() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());

        assert!(register(store, "a@example.com", "", &config_path).await.is_err());
        assert!(!config_path.exists());
    }
}
