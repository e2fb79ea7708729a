use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const MAX_COIN_ID_LEN: usize = 50;

/// Validated, lowercased market-data coin identifier (e.g. `bitcoin`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoinId(String);

impl CoinId {
    /// Accepts `[a-zA-Z0-9_-]{1,50}` and normalizes to lowercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError::EmptyCoinId);
        }

        for (index, ch) in input.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_';
            if !valid {
                return Err(ValidationError::CoinIdInvalidChar { ch, index });
            }
        }

        let len = input.len();
        if len > MAX_COIN_ID_LEN {
            return Err(ValidationError::CoinIdTooLong {
                len,
                max: MAX_COIN_ID_LEN,
            });
        }

        Ok(Self(input.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CoinId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CoinId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CoinId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CoinId> for String {
    fn from(value: CoinId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_lowercase() {
        assert_eq!(CoinId::parse("BITCOIN").expect("valid").as_str(), "bitcoin");
        assert_eq!(
            CoinId::parse("wrapped_BTC-2").expect("valid").as_str(),
            "wrapped_btc-2"
        );
    }

    #[test]
    fn rejects_path_traversal() {
        let err = CoinId::parse("../../etc").expect_err("must fail");
        assert_eq!(err, ValidationError::CoinIdInvalidChar { ch: '.', index: 0 });
    }

    #[test]
    fn rejects_whitespace_instead_of_trimming() {
        assert!(matches!(
            CoinId::parse(" bitcoin"),
            Err(ValidationError::CoinIdInvalidChar { ch: ' ', .. })
        ));
    }

    #[test]
    fn enforces_length_limit() {
        assert!(CoinId::parse(&"a".repeat(MAX_COIN_ID_LEN)).is_ok());
        assert!(matches!(
            CoinId::parse(&"a".repeat(MAX_COIN_ID_LEN + 1)),
            Err(ValidationError::CoinIdTooLong { len: 51, .. })
        ));
        assert_eq!(CoinId::parse(""), Err(ValidationError::EmptyCoinId));
    }
}
