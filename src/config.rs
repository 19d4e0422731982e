//! Keywarden configuration.

use crate::crypto::key::PublicKey;
use crate::license::record::FEATURE_COUNT;
use crate::KeywardenError;
use std::time::Duration;

/// Configuration for one licensed product.
///
/// Values are `&'static str` because they belong in the application binary,
/// not in the environment or a config file.
#[derive(Debug, Clone)]
pub struct KeywardenConfig {
    /// Product id on the licensing server.
    pub product_id: i64,

    /// Access token used for API requests.
    pub access_token: &'static str,

    /// Server verification key as `<RSAKeyValue>` text.
    pub rsa_public_key: &'static str,

    /// Feature indices (1..=8) the license must have enabled.
    pub required_features: &'static [usize],

    /// Floating license settings; `None` for node-locked licenses.
    pub floating: Option<FloatingConfig>,

    /// Maximum signature age in days; `None` disables the check.
    pub signature_expiration_days: Option<u32>,

    /// Store namespace for persisted licenses.
    /// Each product should use a unique namespace to avoid collisions.
    pub store_namespace: &'static str,

    /// How long a stored license stays usable without reaching the server.
    pub offline_grace: Duration,

    /// HTTP transport settings.
    pub transport: TransportConfig,
}

/// Floating license settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatingConfig {
    /// Lease length requested on activation, in seconds.
    pub lease_seconds: u32,
    /// Extra slots allowed beyond the machine cap; 0 disables overdraft.
    pub max_overdraft: u32,
}

/// Settings consumed once when the HTTP transport is built.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Server root, e.g. `https://api.example.com`.
    pub base_url: &'static str,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional proxy URL for all requests.
    pub proxy: Option<&'static str>,
    /// Reuse connections between requests.
    pub keep_alive: bool,
    /// Product token for the User-Agent header.
    pub user_agent_product: &'static str,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cryptolens.io",
            timeout: Duration::from_secs(30),
            proxy: None,
            keep_alive: true,
            user_agent_product: "keywarden",
        }
    }
}

impl KeywardenConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), KeywardenError> {
        if self.product_id <= 0 {
            return Err(KeywardenError::ConfigError(format!(
                "product_id must be positive, got {}",
                self.product_id
            )));
        }
        if self.store_namespace.is_empty() {
            return Err(KeywardenError::ConfigError(
                "store_namespace cannot be empty".to_string(),
            ));
        }
        if let Some(n) = self
            .required_features
            .iter()
            .find(|n| !(1..=FEATURE_COUNT).contains(n))
        {
            return Err(KeywardenError::ConfigError(format!(
                "required feature {} is outside 1..={}",
                n, FEATURE_COUNT
            )));
        }
        if self.transport.base_url.is_empty() {
            return Err(KeywardenError::ConfigError(
                "transport.base_url cannot be empty".to_string(),
            ));
        }

        self.public_key().map(|_| ())
    }

    /// Parsed verification key.
    pub fn public_key(&self) -> Result<PublicKey, KeywardenError> {
        crate::crypto::key::decode_public_key(self.rsa_public_key)
            .map_err(|e| KeywardenError::ConfigError(format!("rsa_public_key: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TEST_PUBLIC_KEY_XML;

    fn config() -> KeywardenConfig {
        KeywardenConfig {
            product_id: 3349,
            access_token: "token",
            rsa_public_key: TEST_PUBLIC_KEY_XML,
            required_features: &[1, 8],
            floating: None,
            signature_expiration_days: Some(30),
            store_namespace: "keywarden-test",
            offline_grace: Duration::from_secs(24 * 60 * 60),
            transport: TransportConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_product() {
        let mut config = config();
        config.product_id = 0;
        assert!(matches!(config.validate(), Err(KeywardenError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_empty_namespace() {
        let mut config = config();
        config.store_namespace = "";
        assert!(matches!(config.validate(), Err(KeywardenError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_feature_out_of_range() {
        for features in [&[0usize][..], &[9][..], &[1, 2, 12][..]] {
            let mut config = config();
            config.required_features = features;
            assert!(matches!(config.validate(), Err(KeywardenError::ConfigError(_))));
        }
    }

    #[test]
    fn test_rejects_bad_public_key() {
        let mut config = config();
        config.rsa_public_key = "<RSAKeyValue><Exponent>AQAB</Exponent></RSAKeyValue>";
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rsa_public_key"));
    }
}
