use std::fmt::{Display, Formatter};
use std::str::FromStr;

use coinwatch_store::{LocalStore, StoreError, THEME_KEY};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// UI colour scheme persisted on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// Stored theme, or the default when unset or unrecognized.
    pub fn load(store: &dyn LocalStore) -> Result<Self, StoreError> {
        Ok(store
            .get(THEME_KEY)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn save(self, store: &dyn LocalStore) -> Result<(), StoreError> {
        store.set(THEME_KEY, self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(ValidationError::InvalidTheme {
                value: other.to_owned(),
            }),
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwatch_store::MemoryStore;

    #[test]
    fn persists_and_defaults() {
        let store = MemoryStore::new();
        assert_eq!(Theme::load(&store).expect("load"), Theme::Dark);

        Theme::Light.save(&store).expect("save");
        assert_eq!(Theme::load(&store).expect("load"), Theme::Light);

        store.set(THEME_KEY, "solarized").expect("set");
        assert_eq!(Theme::load(&store).expect("load"), Theme::Dark);
    }
}
