//! User profiles stored at `users/{uid}` and the favorites list inside them.
//!
//! Favorites have no local copy. Every change reads the profile, edits the
//! list and writes the whole `favoriteCoins` field back in one update.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::clock::{now_rfc3339, SharedClock};
use crate::domain::{Theme, UserKey};
use crate::error::{ServiceError, ValidationError};
use crate::remote::{RemoteBackend, RemoteStore};
use crate::security::{secure_log, LogLevel};

pub fn profile_path(uid: &str) -> String {
    format!("users/{uid}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub currency: String,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            currency: String::from("usd"),
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub favorite_coins: Vec<String>,
    pub watchlist: Vec<String>,
    pub preferences: Preferences,
    pub created_at: String,
    pub last_login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserProfile {
    pub fn new_at(timestamp: &str) -> Self {
        Self {
            created_at: timestamp.to_owned(),
            last_login: timestamp.to_owned(),
            ..Self::default()
        }
    }
}

/// Partial profile edit; `None` fields are left as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub preferences: Option<Preferences>,
    pub watchlist: Option<Vec<String>>,
}

impl ProfileUpdate {
    fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(display_name) = self.display_name {
            fields.insert(String::from("displayName"), Value::String(display_name));
        }
        if let Some(preferences) = self.preferences {
            fields.insert(String::from("preferences"), json!(preferences));
        }
        if let Some(watchlist) = self.watchlist {
            fields.insert(String::from("watchlist"), json!(watchlist));
        }
        fields
    }
}

/// Account creation form, checked before anything is sent anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: Option<String>,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let problem = if self.email.trim().is_empty() {
            Some(ValidationError::EmptyEmail)
        } else if self.password.is_empty() {
            Some(ValidationError::EmptyPassword)
        } else if self.password != self.confirm_password {
            Some(ValidationError::PasswordMismatch)
        } else {
            None
        };

        match problem {
            Some(error) => Err(ServiceError::validation_rejected(error)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileService {
    backend: RemoteBackend,
    clock: SharedClock,
}

impl ProfileService {
    pub fn new(backend: RemoteBackend, clock: SharedClock) -> Self {
        Self { backend, clock }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    fn store(&self) -> Result<&dyn RemoteStore, ServiceError> {
        self.backend
            .store()
            .map(|store| store.as_ref())
            .ok_or_else(|| ServiceError::backend_unavailable("remote profile store is not configured"))
    }

    fn now(&self) -> String {
        now_rfc3339(self.clock.as_ref())
    }

    /// Stored profile, created with defaults on first access. Without a
    /// backend the defaults are returned and nothing is written.
    pub async fn load_or_create(&self, uid: &str) -> Result<UserProfile, ServiceError> {
        let Ok(store) = self.store() else {
            return Ok(UserProfile::new_at(&self.now()));
        };

        let path = profile_path(uid);
        if let Some(value) = store.get(&path).await.inspect_err(|error| {
            secure_log(
                LogLevel::Error,
                "Failed to get user profile",
                Some(json!({ "uid": uid, "error": error.message() })),
            );
        })? {
            return serde_json::from_value(value).map_err(|error| {
                ServiceError::backend_unavailable(format!("stored profile is malformed: {error}"))
            });
        }

        let profile = UserProfile::new_at(&self.now());
        store.set(&path, json!(profile)).await?;
        secure_log(LogLevel::Info, "Created user profile", Some(json!({ "uid": uid })));
        Ok(profile)
    }

    /// Create the profile for a new account after the form passes validation.
    pub async fn register(&self, uid: &str, form: &SignUpForm) -> Result<UserProfile, ServiceError> {
        form.validate()?;
        let store = self.store()?;

        let profile = UserProfile {
            display_name: form.display_name.clone(),
            email: Some(form.email.trim().to_owned()),
            ..UserProfile::new_at(&self.now())
        };
        store.set(&profile_path(uid), json!(profile)).await?;
        secure_log(LogLevel::Info, "User signed up with email", Some(json!({ "uid": uid })));
        Ok(profile)
    }

    pub async fn record_login(&self, uid: &str) -> Result<(), ServiceError> {
        let mut fields = Map::new();
        fields.insert(String::from("lastLogin"), Value::String(self.now()));
        self.store()?.update(&profile_path(uid), fields).await
    }

    /// Merge `update` into the stored profile and stamp `updatedAt`.
    pub async fn update(&self, uid: &str, update: ProfileUpdate) -> Result<(), ServiceError> {
        let mut fields = update.into_fields();
        fields.insert(String::from("updatedAt"), Value::String(self.now()));
        self.store()?.update(&profile_path(uid), fields).await?;
        secure_log(LogLevel::Info, "Profile updated", Some(json!({ "uid": uid })));
        Ok(())
    }

    /// Favorites of a signed-in user; `None` for guests.
    pub async fn favorites(&self, user: &UserKey) -> Result<Option<Vec<String>>, ServiceError> {
        let Some(uid) = user.uid() else {
            return Ok(None);
        };
        self.store()?;
        Ok(Some(self.load_or_create(uid).await?.favorite_coins))
    }

    pub async fn add_favorite(&self, user: &UserKey, coin_id: &str) -> Result<Option<Vec<String>>, ServiceError> {
        self.edit_favorites(user, coin_id, |favorites, id| {
            if favorites.iter().any(|existing| existing == id) {
                return false;
            }
            favorites.push(id.to_owned());
            true
        })
        .await
    }

    pub async fn remove_favorite(&self, user: &UserKey, coin_id: &str) -> Result<Option<Vec<String>>, ServiceError> {
        self.edit_favorites(user, coin_id, |favorites, id| {
            let before = favorites.len();
            favorites.retain(|existing| existing != id);
            favorites.len() != before
        })
        .await
    }

    async fn edit_favorites(
        &self,
        user: &UserKey,
        coin_id: &str,
        edit: impl FnOnce(&mut Vec<String>, &str) -> bool,
    ) -> Result<Option<Vec<String>>, ServiceError> {
        let coin_id = coin_id.trim();
        if coin_id.is_empty() {
            return Err(ValidationError::EmptyCoinId.into());
        }
        let Some(uid) = user.uid() else {
            return Ok(None);
        };
        let store = self.store()?;

        let mut favorites = self.load_or_create(uid).await?.favorite_coins;
        if !edit(&mut favorites, coin_id) {
            return Ok(Some(favorites));
        }

        let mut fields = Map::new();
        fields.insert(String::from("favoriteCoins"), json!(favorites));
        fields.insert(String::from("updatedAt"), Value::String(self.now()));
        store.update(&profile_path(uid), fields).await?;
        Ok(Some(favorites))
    }
}
