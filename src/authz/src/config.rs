//! Authorization configuration loading and validation

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// When a user's permission set is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Resolve against the store on every request (within one process the
    /// in-process cache still applies)
    #[default]
    PerRequest,

    /// Resolve once per login and keep the list in the session store
    PerLogin,
}

/// Complete authorization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Master switch; when off every check of an identified user passes
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub mode: AuthMode,

    /// Upper bound on a single store call
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    #[serde(default)]
    pub tables: TableNames,

    #[serde(default)]
    pub ignore: IgnoreLists,
}

/// Names of the backing tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    /// Group (role) table
    #[serde(default = "default_group_table")]
    pub group: String,

    /// User-to-group membership table
    #[serde(default = "default_group_access_table")]
    pub group_access: String,

    /// Rule table
    #[serde(default = "default_rule_table")]
    pub rule: String,
}

/// Names that bypass the check entirely
///
/// `string` applies to string checks; `controller` and then `action` apply
/// to route checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreLists {
    /// Controllers whose every action is public
    #[serde(default)]
    pub controller: Vec<String>,

    /// `controller_action` names that are public
    #[serde(default)]
    pub action: Vec<String>,

    /// Arbitrary permission names that always pass
    #[serde(default)]
    pub string: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: AuthMode::default(),
            store_timeout_ms: default_store_timeout_ms(),
            tables: TableNames::default(),
            ignore: IgnoreLists::default(),
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            group: default_group_table(),
            group_access: default_group_access_table(),
            rule: default_rule_table(),
        }
    }
}

fn default_true() -> bool { true }
fn default_store_timeout_ms() -> u64 { 3000 }
fn default_group_table() -> String { "auth_role".to_string() }
fn default_group_access_table() -> String { "auth_role_access".to_string() }
fn default_rule_table() -> String { "auth_rule".to_string() }

impl AuthConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)
            .map_err(|e| AuthError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AuthConfig =
            toml::from_str(contents).map_err(|e| AuthError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (label, name) in [
            ("tables.group", &self.tables.group),
            ("tables.group_access", &self.tables.group_access),
            ("tables.rule", &self.tables.rule),
        ] {
            if !is_identifier(name) {
                return Err(AuthError::Config(format!(
                    "{} must be a plain SQL identifier, got `{}`",
                    label, name
                )));
            }
        }

        if self.store_timeout_ms == 0 {
            return Err(AuthError::Config("store_timeout_ms must be positive".into()));
        }

        Ok(())
    }

    /// Store call timeout
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl IgnoreLists {
    /// Whether `controller` is listed (case-insensitive)
    pub fn ignores_controller(&self, controller: &str) -> bool {
        contains_folded(&self.controller, controller)
    }

    /// Whether the `controller_action` name is listed (case-insensitive)
    pub fn ignores_action(&self, name: &str) -> bool {
        contains_folded(&self.action, name)
    }

    /// Whether the permission name is listed (case-insensitive)
    pub fn ignores_string(&self, name: &str) -> bool {
        contains_folded(&self.string, name)
    }
}

fn contains_folded(list: &[String], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    list.iter().any(|entry| entry.to_lowercase() == needle)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::from_toml("").unwrap();
        assert_eq!(config, AuthConfig::default());
        assert!(config.enabled);
        assert_eq!(config.mode, AuthMode::PerRequest);
        assert_eq!(config.tables.rule, "auth_rule");
        assert_eq!(config.store_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_full_config() {
        let config = AuthConfig::from_toml(
            r#"
            enabled = false
            mode = "per-login"
            store_timeout_ms = 500

            [tables]
            group = "roles"
            group_access = "role_members"
            rule = "permissions"

            [ignore]
            controller = ["Index"]
            action = ["user_login"]
            string = ["public_feed"]
            "#,
        )
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(config.mode, AuthMode::PerLogin);
        assert_eq!(config.tables.group_access, "role_members");
        assert!(config.ignore.ignores_controller("index"));
        assert!(config.ignore.ignores_action("USER_LOGIN"));
        assert!(config.ignore.ignores_string("Public_Feed"));
        assert!(!config.ignore.ignores_string("private_feed"));
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        let err = AuthConfig::from_toml(
            r#"
            [tables]
            rule = "auth_rule; DROP TABLE users"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::Config(msg) if msg.contains("tables.rule")));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(AuthConfig::from_toml("store_timeout_ms = 0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"per-login\"").unwrap();

        let config = AuthConfig::load(file.path()).unwrap();
        assert_eq!(config.mode, AuthMode::PerLogin);

        assert!(AuthConfig::load("/nonexistent/auth.toml").is_err());
    }
}
