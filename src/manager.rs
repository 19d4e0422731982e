//! License Manager - the main public API for Keywarden.
//!
//! The `LicenseManager` provides a simple interface for license checks:
//! - Online activation with envelope signature verification
//! - Offline fallback to a re-verified stored license
//! - Access policy enforcement (features, expiry, machine, signature age)

use crate::client::api;
use crate::client::http::HttpTransport;
use crate::client::requests::{ActivateRequest, DeactivateRequest, GetKeyRequest};
use crate::client::Transport;
use crate::clock::{Clock, SystemClock};
use crate::config::KeywardenConfig;
use crate::crypto::key::PublicKey;
use crate::license::record::LicenseKey;
use crate::license::validate::ValidationFailure;
use crate::policy::access::{check_access, AccessContext, AccessPolicy};
use crate::store::file::FileStore;
use crate::store::format::StoredLicense;
use crate::KeywardenError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a successful license check.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// The verified license.
    pub license: LicenseKey,

    /// Whether this result came from the local store.
    pub from_store: bool,
}

/// Main license manager for Keywarden.
///
/// Create one instance per application and reuse it for all license checks.
pub struct LicenseManager {
    config: KeywardenConfig,
    public_key: PublicKey,
    policy: AccessPolicy,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
    store: FileStore,
}

impl LicenseManager {
    /// Create a new license manager with the given configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - HTTP client creation fails
    /// - Store directory creation fails
    pub fn new(config: KeywardenConfig) -> Result<Self, KeywardenError> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config.transport)?);
        let store = FileStore::new(config.store_namespace)?;
        Self::from_parts(config, transport, store, Arc::new(SystemClock))
    }

    /// Create a license manager with injected collaborators (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_parts(
        config: KeywardenConfig,
        transport: Arc<dyn Transport>,
        store: FileStore,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, KeywardenError> {
        config.validate()?;
        Self::from_parts(config, transport, store, clock)
    }

    fn from_parts(
        config: KeywardenConfig,
        transport: Arc<dyn Transport>,
        store: FileStore,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, KeywardenError> {
        let public_key = config.public_key()?;
        let policy = AccessPolicy::from_config(&config);

        Ok(Self {
            config,
            public_key,
            policy,
            clock,
            transport,
            store,
        })
    }

    /// Activate `license_key` on `machine_code` and check access.
    ///
    /// This performs the full pipeline:
    /// 1. Activate online and verify the signed envelope
    /// 2. Check the access policy
    /// 3. Store the signed envelope
    /// 4. Fall back to the stored license if the server cannot be reached
    ///
    /// # Errors
    /// - `MissingLicense` - No license key provided
    /// - `ServerError` - The server rejected the activation
    /// - `SignatureInvalid` - Envelope signature verification failed
    /// - `Validation` - A policy check failed
    /// - `StoreExpired` / `StoreTampered` - Offline and the stored license is unusable
    pub fn activate(&self, license_key: &str, machine_code: &str) -> Result<ValidationResult, KeywardenError> {
        if license_key.is_empty() {
            return Err(KeywardenError::MissingLicense);
        }

        match self.activate_online(license_key, machine_code) {
            Ok(result) => Ok(result),
            Err(online_error) => self.activate_offline(license_key, machine_code, online_error),
        }
    }

    /// Check access using only the stored license.
    pub fn check_offline(&self, license_key: &str, machine_code: &str) -> Result<ValidationResult, KeywardenError> {
        if license_key.is_empty() {
            return Err(KeywardenError::MissingLicense);
        }

        let license = self.load_stored(license_key)?;
        self.check_policy(&license, machine_code)?;

        Ok(ValidationResult {
            license,
            from_store: true,
        })
    }

    /// Fetch the current signed state of `license` and replace it in place.
    ///
    /// The fresh record must pass the access policy for `machine_code`;
    /// otherwise neither `license` nor the stored copy changes.
    pub fn refresh(&self, license: &mut LicenseKey, machine_code: &str) -> Result<(), KeywardenError> {
        let request = GetKeyRequest {
            product_id: self.config.product_id,
            key: license.key.clone(),
        };
        let raw = api::get_key(self.transport.as_ref(), self.config.access_token, &request)?;
        let fresh = LicenseKey::from_envelope(raw, &self.public_key)?;
        self.check_policy(&fresh, machine_code)?;

        self.store
            .save(&fresh.key, &StoredLicense::from_license(&fresh, self.clock.as_ref())?)?;
        license.refresh(fresh);
        Ok(())
    }

    /// Release the activation of `license_key` on `machine_code` and forget
    /// the stored copy.
    pub fn deactivate(&self, license_key: &str, machine_code: &str) -> Result<(), KeywardenError> {
        if license_key.is_empty() {
            return Err(KeywardenError::MissingLicense);
        }

        let request = DeactivateRequest {
            product_id: self.config.product_id,
            key: license_key.to_string(),
            machine_code: machine_code.to_string(),
            floating: self.config.floating.is_some(),
        };
        api::deactivate(self.transport.as_ref(), self.config.access_token, &request)?;
        self.store.delete(license_key)
    }

    fn activate_online(&self, license_key: &str, machine_code: &str) -> Result<ValidationResult, KeywardenError> {
        let floating = self.config.floating;
        let request = ActivateRequest {
            product_id: self.config.product_id,
            key: license_key.to_string(),
            machine_code: machine_code.to_string(),
            friendly_name: None,
            floating_time_interval: floating.map(|f| f.lease_seconds),
            max_overdraft: floating.map(|f| f.max_overdraft),
        };

        let raw = api::activate(self.transport.as_ref(), self.config.access_token, &request)?;
        let license = LicenseKey::from_envelope(raw, &self.public_key)?;

        self.check_policy(&license, machine_code)?;

        let record = StoredLicense::from_license(&license, self.clock.as_ref())?;
        self.store.save(license_key, &record)?;

        Ok(ValidationResult {
            license,
            from_store: false,
        })
    }

    fn activate_offline(
        &self,
        license_key: &str,
        machine_code: &str,
        online_error: KeywardenError,
    ) -> Result<ValidationResult, KeywardenError> {
        // Only fall back when the server could not be reached.
        if !matches!(online_error, KeywardenError::Transport(_)) {
            return Err(online_error);
        }

        let Some(record) = self.store.load(license_key)? else {
            return Err(online_error);
        };
        warn!(error = %online_error, "licensing server unreachable, using stored license");

        let license = record.verify(&self.public_key, self.config.offline_grace, self.clock.as_ref())?;
        self.check_policy(&license, machine_code)?;

        Ok(ValidationResult {
            license,
            from_store: true,
        })
    }

    fn load_stored(&self, license_key: &str) -> Result<LicenseKey, KeywardenError> {
        let record = self
            .store
            .load(license_key)?
            .ok_or(KeywardenError::Validation(ValidationFailure::NoLicense))?;

        record.verify(&self.public_key, self.config.offline_grace, self.clock.as_ref())
    }

    fn check_policy(&self, license: &LicenseKey, machine_code: &str) -> Result<(), KeywardenError> {
        let ctx = AccessContext {
            public_key: &self.public_key,
            machine_code,
            clock: self.clock.as_ref(),
        };
        let result = check_access(license, &self.policy, ctx);
        if let Err(e) = &result {
            debug!(key_id = license.id, error = %e, "access denied");
        }
        result
    }

    /// Get the current configuration.
    pub fn config(&self) -> &KeywardenConfig {
        &self.config
    }

    /// The access policy derived from the configuration.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }
}
