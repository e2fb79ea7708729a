use std::fmt::{Display, Formatter};

/// Bucket name used for unauthenticated sessions.
pub const GUEST_ID: &str = "guest";

/// Owner of a remote watchlist snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    User(String),
    Guest,
}

impl UserKey {
    /// Blank or missing ids map to [`UserKey::Guest`].
    pub fn from_option(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::User(id.to_owned()),
            _ => Self::Guest,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::User(id) => id,
            Self::Guest => GUEST_ID,
        }
    }

    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// Authenticated user id, if any.
    pub fn uid(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Guest => None,
        }
    }
}

impl Default for UserKey {
    fn default() -> Self {
        Self::Guest
    }
}

impl Display for UserKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
