//! Shop connection records

use serde::{Deserialize, Serialize};

/// A registered remote shop: base URL plus encrypted REST credentials.
///
/// `consumer_key` and `consumer_secret` hold ciphertext as produced by a
/// [`crate::credentials::CredentialCipher`]; plaintext never reaches the
/// database.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    /// Local primary key
    pub id: i64,
    /// Display name
    pub name: String,
    /// Store base URL (scheme required, no trailing slash)
    pub base_url: String,
    /// Encrypted REST consumer key
    pub consumer_key: String,
    /// Encrypted REST consumer secret
    pub consumer_secret: String,
    /// Whether this shop participates in sync runs
    pub active: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl std::fmt::Debug for Shop {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Shop")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Payload for registering a new shop. Credentials must already be encrypted.
#[derive(Debug, Clone)]
pub struct NewShop {
    pub name: String,
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shop_debug_redacts_credentials() {
        let shop = Shop {
            id: 1,
            name: "demo".to_string(),
            base_url: "https://shop.example.com".to_string(),
            consumer_key: "ck_secret".to_string(),
            consumer_secret: "cs_secret".to_string(),
            active: true,
            created_at: 0,
            updated_at: 0,
        };
        let debug = format!("{shop:?}");
        assert!(!debug.contains("ck_secret"));
        assert!(!debug.contains("cs_secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
