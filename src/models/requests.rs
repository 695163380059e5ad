//! Request DTOs for the dataset API
//!
//! Defines the query parameters accepted alongside request bodies.

use serde::Deserialize;

/// Query parameters for the STORE operation (PUT /datasets/:key)
///
/// # Fields
/// - `ttl`: Optional TTL in seconds (uses the configured default if not specified)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreParams {
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl StoreParams {
    /// Validates the parameters
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.ttl == Some(0) {
            return Some("TTL must be at least 1 second".to_string());
        }
        None
    }

    /// TTL to apply, falling back to `default_ttl`.
    pub fn effective_ttl(&self, default_ttl: u64) -> u64 {
        self.ttl.unwrap_or(default_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_params_deserialize() {
        let params: StoreParams = serde_json::from_str("{}").unwrap();
        assert!(params.ttl.is_none());

        let params: StoreParams = serde_json::from_str(r#"{"ttl": 60}"#).unwrap();
        assert_eq!(params.ttl, Some(60));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let params = StoreParams { ttl: Some(0) };
        assert!(params.validate().is_some());
    }

    #[test]
    fn test_effective_ttl() {
        assert_eq!(StoreParams { ttl: None }.effective_ttl(900), 900);
        assert_eq!(StoreParams { ttl: Some(30) }.effective_ttl(900), 30);
        assert!(StoreParams { ttl: Some(30) }.validate().is_none());
    }
}
