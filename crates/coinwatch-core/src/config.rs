//! Environment-driven configuration.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `COINWATCH_HOME` | `$HOME/.coinwatch` |
//! | `COINWATCH_API_BASE` | `https://api.coingecko.com/api/v3` |
//! | `COINWATCH_USER` | unset (guest) |
//! | `COINWATCH_FIREBASE_API_KEY` | unset |
//! | `COINWATCH_FIREBASE_PROJECT_ID` | unset |
//! | `COINWATCH_FIREBASE_DATABASE_URL` | unset |
//! | `COINWATCH_FIREBASE_AUTH_TOKEN` | unset |
//! | `COINWATCH_GUEST_SYNC` | `true` |
//! | `COINWATCH_MERGE_POLICY` | `last-non-empty` |

use std::path::PathBuf;

use crate::coordinator::MergePolicy;
use crate::domain::UserKey;
use crate::error::ValidationError;
use crate::market_client::DEFAULT_API_BASE;

/// Placeholder project id shipped in sample configuration.
pub const PLACEHOLDER_PROJECT_ID: &str = "crypto-dashboard-demo";
const API_KEY_PREFIX: &str = "AIzaSy";

/// Remote backend credentials. Incomplete or placeholder values leave the
/// application in local-only mode.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub database_url: Option<String>,
    pub auth_token: Option<String>,
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        let key_ok = self
            .api_key
            .as_deref()
            .is_some_and(|key| key.starts_with(API_KEY_PREFIX));
        let project_ok = self
            .project_id
            .as_deref()
            .is_some_and(|project| project != PLACEHOLDER_PROJECT_ID);
        key_ok && project_ok && self.database_url.is_some()
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("database_url", &self.database_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub home: PathBuf,
    pub api_base: String,
    pub user: UserKey,
    pub backend: BackendConfig,
    /// Allow the shared `guest` remote bucket.
    pub guest_sync: bool,
    pub merge_policy: MergePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from(".coinwatch"),
            api_base: String::from(DEFAULT_API_BASE),
            user: UserKey::Guest,
            backend: BackendConfig::default(),
            guest_sync: true,
            merge_policy: MergePolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let var = |name: &str| lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty());

        let home = var("COINWATCH_HOME")
            .map(PathBuf::from)
            .or_else(|| var("HOME").map(|home| PathBuf::from(home).join(".coinwatch")))
            .unwrap_or_else(|| PathBuf::from(".coinwatch"));

        let merge_policy = match var("COINWATCH_MERGE_POLICY") {
            Some(raw) => raw.parse()?,
            None => MergePolicy::default(),
        };

        Ok(Self {
            home,
            api_base: var("COINWATCH_API_BASE").unwrap_or_else(|| String::from(DEFAULT_API_BASE)),
            user: UserKey::from_option(var("COINWATCH_USER").as_deref()),
            backend: BackendConfig {
                api_key: var("COINWATCH_FIREBASE_API_KEY"),
                project_id: var("COINWATCH_FIREBASE_PROJECT_ID"),
                database_url: var("COINWATCH_FIREBASE_DATABASE_URL"),
                auth_token: var("COINWATCH_FIREBASE_AUTH_TOKEN"),
            },
            guest_sync: var("COINWATCH_GUEST_SYNC").is_none_or(|raw| parse_flag(&raw)),
            merge_policy,
        })
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ValidationError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_to_local_only_guest_mode() {
        let config = config(&[("HOME", "/home/ada")]).expect("config");

        assert_eq!(config.home, PathBuf::from("/home/ada/.coinwatch"));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.user, UserKey::Guest);
        assert!(!config.backend.is_configured());
        assert!(config.guest_sync);
        assert_eq!(config.merge_policy, MergePolicy::LastNonEmpty);
    }

    #[test]
    fn backend_needs_real_looking_credentials() {
        let real = [
            ("COINWATCH_FIREBASE_API_KEY", "AIzaSyExample"),
            ("COINWATCH_FIREBASE_PROJECT_ID", "my-dashboard"),
            ("COINWATCH_FIREBASE_DATABASE_URL", "https://my-dashboard.firebaseio.com"),
        ];
        assert!(config(&real).expect("config").backend.is_configured());

        let placeholder = [
            ("COINWATCH_FIREBASE_API_KEY", "AIzaSyExample"),
            ("COINWATCH_FIREBASE_PROJECT_ID", "crypto-dashboard-demo"),
            ("COINWATCH_FIREBASE_DATABASE_URL", "https://demo.firebaseio.com"),
        ];
        assert!(!config(&placeholder).expect("config").backend.is_configured());

        let bad_key = [
            ("COINWATCH_FIREBASE_API_KEY", "your-api-key"),
            ("COINWATCH_FIREBASE_PROJECT_ID", "my-dashboard"),
            ("COINWATCH_FIREBASE_DATABASE_URL", "https://my-dashboard.firebaseio.com"),
        ];
        assert!(!config(&bad_key).expect("config").backend.is_configured());
    }

    #[test]
    fn reads_user_guest_sync_and_policy() {
        let config = config(&[
            ("COINWATCH_HOME", "/tmp/cw"),
            ("COINWATCH_USER", "u1"),
            ("COINWATCH_GUEST_SYNC", "off"),
            ("COINWATCH_MERGE_POLICY", "union"),
        ])
        .expect("config");

        assert_eq!(config.home, PathBuf::from("/tmp/cw"));
        assert_eq!(config.user, UserKey::User(String::from("u1")));
        assert!(!config.guest_sync);
        assert_eq!(config.merge_policy, MergePolicy::Union);
    }

    #[test]
    fn rejects_unknown_merge_policy() {
        assert!(matches!(
            config(&[("COINWATCH_MERGE_POLICY", "newest")]),
            Err(ValidationError::InvalidMergePolicy { .. })
        ));
    }
}
