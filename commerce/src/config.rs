use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Empty store id")]
    EmptyStoreId,

    #[error("Duplicate store id: {0}")]
    DuplicateStoreId(String),

    #[error("Store '{0}' has an empty shop domain")]
    EmptyShopDomain(String),

    #[error("Store '{store_id}' has an unusable shop domain: {message}")]
    InvalidShopDomain { store_id: String, message: String },

    #[error("Store '{0}' has an empty API version")]
    EmptyApiVersion(String),

    #[error("Store '{0}' has an empty access token")]
    EmptyAccessToken(String),
}

/// Credentials for one commerce storefront's admin API.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct StoreCredentials {
    /// Unique identifier used in logs and event tagging.
    pub store_id: String,
    /// Admin host, e.g. "example.myshopify.com".
    pub shop_domain: String,
    /// Admin API version segment, e.g. "2024-01".
    pub api_version: String,
    pub access_token: String,
}

/// Validates a store list once at load time. Stores are independent at
/// fetch time, so the only cross-store rule is id uniqueness.
pub fn validate_stores(stores: &[StoreCredentials]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for store in stores {
        if store.store_id.is_empty() {
            return Err(ValidationError::EmptyStoreId);
        }
        if !seen.insert(&store.store_id) {
            return Err(ValidationError::DuplicateStoreId(store.store_id.clone()));
        }
        if store.shop_domain.is_empty() {
            return Err(ValidationError::EmptyShopDomain(store.store_id.clone()));
        }
        if store.api_version.is_empty() {
            return Err(ValidationError::EmptyApiVersion(store.store_id.clone()));
        }
        if store.access_token.is_empty() {
            return Err(ValidationError::EmptyAccessToken(store.store_id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(id: &str) -> StoreCredentials {
        StoreCredentials {
            store_id: id.to_string(),
            shop_domain: format!("{id}.example.com"),
            api_version: "2024-01".to_string(),
            access_token: "token".to_string(),
        }
    }

    #[test]
    fn unique_stores_pass() {
        assert!(validate_stores(&[store("a"), store("b")]).is_ok());
    }

    #[test]
    fn duplicate_store_id_rejected() {
        assert!(matches!(
            validate_stores(&[store("a"), store("a")]),
            Err(ValidationError::DuplicateStoreId(_))
        ));
    }

    #[test]
    fn empty_access_token_rejected() {
        let mut bad = store("a");
        bad.access_token = String::new();
        assert!(matches!(
            validate_stores(&[bad]),
            Err(ValidationError::EmptyAccessToken(_))
        ));
    }
}
