//! Server configuration.
//!
//! Loaded from a TOML file. A bare name resolves to
//! `/etc/cookery/<name>.toml`; anything containing `/` or `.` is used
//! as a path directly.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub engagement: EngagementSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for the SQLite database and any future on-disk state.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret used to *verify* tokens issued by the identity
    /// provider. Cookery never issues tokens itself.
    pub secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngagementSection {
    /// Override for the view cool-down window (seconds).
    #[serde(default)]
    pub view_cooldown_secs: Option<i64>,

    /// Override for the checks worker poll interval (seconds).
    #[serde(default)]
    pub checks_poll_interval: Option<u64>,
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/cookery/{name_or_path}.toml"))
        }
    }

    /// Load and parse the config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Sanity-check the loaded configuration.
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.storage.data_dir.is_empty() {
            anyhow::bail!("storage.data_dir must not be empty");
        }
        if self.jwt.secret.len() < 16 {
            anyhow::bail!("jwt.secret must be at least 16 characters");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_name_vs_path() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/cookery/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn parse_and_verify() {
        let config: ServerConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/cookery"

            [jwt]
            secret = "0123456789abcdef0123456789abcdef"

            [engagement]
            view_cooldown_secs = 600
            "#,
        )
        .unwrap();
        config.verify().unwrap();
        assert_eq!(config.engagement.view_cooldown_secs, Some(600));
        assert_eq!(config.engagement.checks_poll_interval, None);
    }

    #[test]
    fn short_secret_rejected() {
        let config: ServerConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/cookery"

            [jwt]
            secret = "short"
            "#,
        )
        .unwrap();
        assert!(config.verify().is_err());
    }
}
