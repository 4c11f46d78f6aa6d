//! Credential lookup.
//!
//! A credential is looked up by name: the environment variable of that name wins, then
//! the key-value store entry under the same key (`acip key set GEMINI_API_KEY ...`).
//! Values are opaque; only presence matters and they are never logged.

use crate::db::KvStore;

pub async fn resolve_credential(name: &str, store: &dyn KvStore) -> Option<String> {
    if let Some(value) = std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        tracing::debug!("Credential {} resolved from environment", name);
        return Some(value);
    }

    match store.get(name).await {
        Ok(Some(value)) if !value.trim().is_empty() => {
            tracing::debug!("Credential {} resolved from key store", name);
            Some(value.trim().to_string())
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Failed to read credential {} from store: {}", name, e);
            None
        }
    }
}

/// Mask a credential for display: first four characters, then asterisks.
pub fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "*".repeat(value.chars().count())
    } else {
        format!("{}****", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LibsqlStore;

    #[tokio::test]
    async fn test_env_wins_over_store() {
        let store = LibsqlStore::new_memory().await.unwrap();
        store.set("ACIP_CRED_TEST_ENV_WINS", "from-store").await.unwrap();

        std::env::set_var("ACIP_CRED_TEST_ENV_WINS", "from-env");
        let value = resolve_credential("ACIP_CRED_TEST_ENV_WINS", &store).await;
        std::env::remove_var("ACIP_CRED_TEST_ENV_WINS");

        assert_eq!(value.as_deref(), Some("from-env"));
    }

    #[tokio::test]
    async fn test_store_fallback_and_blank_values() {
        let store = LibsqlStore::new_memory().await.unwrap();
        assert_eq!(resolve_credential("ACIP_CRED_TEST_UNSET", &store).await, None);

        store.set("ACIP_CRED_TEST_UNSET", "  stored-key ").await.unwrap();
        assert_eq!(
            resolve_credential("ACIP_CRED_TEST_UNSET", &store).await.as_deref(),
            Some("stored-key")
        );

        store.set("ACIP_CRED_TEST_UNSET", "   ").await.unwrap();
        assert_eq!(resolve_credential("ACIP_CRED_TEST_UNSET", &store).await, None);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("sk-abcdef"), "sk-a****");
        assert_eq!(mask("abc"), "***");
    }
}
