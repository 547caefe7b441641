use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Admin credential pair for the admin surface.
///
/// This is a UI gate for a single low-stakes event, not a security boundary:
/// credentials arrive over whatever transport the deployment provides and
/// sessions live in memory.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Credentials for the admin endpoints.
    /// If not set, the admin surface is disabled (returns 503).
    pub admin_credentials: Option<AdminCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let admin_credentials = parse_admin_credentials(
            env::var("ADMIN_USERNAME").ok(),
            env::var("ADMIN_PASSWORD").ok(),
        );

        Ok(Config {
            port,
            state_dir,
            admin_credentials,
        })
    }
}

/// Parse the admin credential pair from optional environment values.
///
/// Returns None unless both values are present and contain non-whitespace
/// content. This prevents an empty username or password from allowing
/// access to the admin surface.
pub fn parse_admin_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Option<AdminCredentials> {
    let username = username.filter(|s| !s.trim().is_empty())?;
    let password = password.filter(|s| !s.trim().is_empty())?;
    Some(AdminCredentials { username, password })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_credentials_none() {
        assert!(parse_admin_credentials(None, None).is_none());
    }

    #[test]
    fn test_parse_admin_credentials_missing_password() {
        assert!(parse_admin_credentials(Some("admin".to_string()), None).is_none());
    }

    #[test]
    fn test_parse_admin_credentials_empty_strings() {
        // Empty values should be treated as unset
        assert!(parse_admin_credentials(Some("".to_string()), Some("".to_string())).is_none());
        assert!(parse_admin_credentials(Some("admin".to_string()), Some("".to_string())).is_none());
    }

    #[test]
    fn test_parse_admin_credentials_whitespace_only() {
        assert!(
            parse_admin_credentials(Some("   ".to_string()), Some("secret".to_string())).is_none()
        );
        assert!(
            parse_admin_credentials(Some("admin".to_string()), Some("\t\n".to_string())).is_none()
        );
    }

    #[test]
    fn test_parse_admin_credentials_valid() {
        let creds = parse_admin_credentials(Some("admin".to_string()), Some("secret".to_string()))
            .expect("should parse");
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "secret");
    }
}
