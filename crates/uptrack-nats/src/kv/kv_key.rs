//! Key-value key types and traits.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uptrack_core::store::TokenId;

/// Marker trait for KV key types.
///
/// This trait defines how keys are formatted for storage in NATS KV.
pub trait KvKey: fmt::Debug + fmt::Display + Clone + Send + Sync + 'static {}

/// Key for a token.
///
/// Each segment is base64url encoded so any token name fits the KV key
/// alphabet. The namespace segment, when present, comes first and is joined
/// with `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    namespace: Option<String>,
    name: String,
}

impl TokenKey {
    /// Returns the namespace, if any.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the leaf name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl KvKey for TokenKey {}

impl From<&TokenId> for TokenKey {
    fn from(id: &TokenId) -> Self {
        Self {
            namespace: id.namespace().map(str::to_owned),
            name: id.name().to_owned(),
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.namespace {
            write!(f, "{}.", URL_SAFE_NO_PAD.encode(namespace))?;
        }
        write!(f, "{}", URL_SAFE_NO_PAD.encode(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_key_keeps_segments() {
        let id = TokenId::new("a/b c+d", Some("progress"), ':').unwrap();
        let key = TokenKey::from(&id);
        assert_eq!(key.namespace(), Some("progress"));
        assert_eq!(key.name(), "a/b c+d");
        assert_eq!(key.to_string(), "cHJvZ3Jlc3M.YS9iIGMrZA");
    }

    #[test]
    fn test_namespaces_give_distinct_keys() {
        let progress = TokenId::new("tok", Some("progress"), ':').unwrap();
        let health = TokenId::new("tok", Some("health"), ':').unwrap();
        assert_ne!(
            TokenKey::from(&progress).to_string(),
            TokenKey::from(&health).to_string()
        );
    }

    #[test]
    fn test_token_key_uses_kv_alphabet() {
        let id = TokenId::new("weird name/with*wildcards>", Some("ns.dots"), ':').unwrap();
        let key = TokenKey::from(&id).to_string();

        assert_eq!(key.matches('.').count(), 1);
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn test_unnamespaced_key() {
        let id = TokenId::new("tok", None, ':').unwrap();
        let key = TokenKey::from(&id);
        assert!(!key.to_string().contains('.'));
        assert_eq!(key.namespace(), None);
    }
}
