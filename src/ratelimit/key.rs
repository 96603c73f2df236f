//! Client identity and endpoint category keys.

use std::fmt;
use std::sync::Arc;

/// Identity used when the caller could not supply one.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Category label of the fallback policy.
pub const DEFAULT_CATEGORY: &str = "default";

/// Opaque identifier of the requester, typically an IP address.
///
/// The value is not validated; it is only used as a lookup key. Blank
/// identities collapse onto [`UNKNOWN_CLIENT`] so that evaluation never
/// fails for lack of one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self(UNKNOWN_CLIENT.to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The rate limit bucket a request path resolved to.
///
/// Either the text of the matching policy pattern or [`DEFAULT_CATEGORY`].
/// Every ledger record carries one, so clones only bump a refcount.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointCategory(Arc<str>);

impl EndpointCategory {
    pub fn new(label: &str) -> Self {
        Self(Arc::from(label))
    }

    pub fn default_category() -> Self {
        Self::new(DEFAULT_CATEGORY)
    }

    pub fn is_default(&self) -> bool {
        &*self.0 == DEFAULT_CATEGORY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_key_keeps_value() {
        let key = ClientKey::new("1.2.3.4");
        assert_eq!(key.as_str(), "1.2.3.4");
        assert_eq!(key.to_string(), "1.2.3.4");
    }

    #[test]
    fn test_blank_client_key_falls_back_to_unknown() {
        assert_eq!(ClientKey::new("").as_str(), UNKNOWN_CLIENT);
        assert_eq!(ClientKey::new("   ").as_str(), UNKNOWN_CLIENT);
        assert_eq!(ClientKey::from("\t"), ClientKey::new(UNKNOWN_CLIENT));
    }

    #[test]
    fn test_default_category() {
        let category = EndpointCategory::default_category();
        assert!(category.is_default());
        assert_eq!(category.as_str(), "default");
        assert!(!EndpointCategory::new("/api/v1/auth/login").is_default());
    }
}
