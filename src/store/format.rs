//! Stored license document.
//!
//! A stored license keeps the signed wire payload exactly as received, plus
//! the time it was saved. On load, we:
//! 1. Re-verify the signature with the configured key (required)
//! 2. Check `now - saved_at <= offline_grace`
//! 3. Reject `saved_at` in the future

use crate::clock::Clock;
use crate::crypto::key::PublicKey;
use crate::license::record::LicenseKey;
use crate::protocol::models::{LegacyKeyInformation, RawResponse, WireLicense};
use crate::KeywardenError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Signed payload in one of the two wire encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StoredFormat {
    /// Legacy key information with its detached signature.
    Legacy(LegacyKeyInformation),
    /// Raw-response envelope.
    Envelope(RawResponse),
}

impl From<WireLicense> for StoredFormat {
    fn from(wire: WireLicense) -> Self {
        match wire {
            WireLicense::Legacy(info) => StoredFormat::Legacy(info),
            WireLicense::Envelope(raw) => StoredFormat::Envelope(raw),
        }
    }
}

impl From<StoredFormat> for WireLicense {
    fn from(format: StoredFormat) -> Self {
        match format {
            StoredFormat::Legacy(info) => WireLicense::Legacy(info),
            StoredFormat::Envelope(raw) => WireLicense::Envelope(raw),
        }
    }
}

/// A license document as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLicense {
    /// The signed payload.
    pub format: StoredFormat,

    /// When this document was saved.
    pub saved_at: DateTime<Utc>,
}

impl StoredLicense {
    /// Wrap a signed payload, stamped with the current time.
    pub fn new(format: StoredFormat, clock: &dyn Clock) -> Self {
        Self {
            format,
            saved_at: clock.now_utc(),
        }
    }

    /// Store the signed payload behind `license`.
    ///
    /// Transport-trusted records have none and cannot be stored.
    pub fn from_license(license: &LicenseKey, clock: &dyn Clock) -> Result<Self, KeywardenError> {
        let wire = license.to_wire().ok_or_else(|| {
            KeywardenError::StoreIO("License has no signed payload to store".to_string())
        })?;
        Ok(Self::new(wire.into(), clock))
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, KeywardenError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KeywardenError::StoreIO(format!("Failed to serialize license: {}", e)))
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, KeywardenError> {
        serde_json::from_str(json)
            .map_err(|e| KeywardenError::StoreIO(format!("Failed to deserialize license: {}", e)))
    }

    /// Verify the stored payload and return the license it carries.
    pub fn verify(
        &self,
        key: &PublicKey,
        offline_grace: Duration,
        clock: &dyn Clock,
    ) -> Result<LicenseKey, KeywardenError> {
        let wire = WireLicense::from(self.format.clone());
        let license = wire.into_verified_license(key).map_err(|e| {
            warn!(error = %e, "stored license failed verification");
            KeywardenError::StoreTampered
        })?;

        let age = clock.now_utc().signed_duration_since(self.saved_at);
        let grace_secs = i64::try_from(offline_grace.as_secs()).unwrap_or(i64::MAX);

        if age.num_seconds() > grace_secs {
            return Err(KeywardenError::StoreExpired);
        }

        // Saved in the future: the local clock was moved back.
        if age.num_seconds() < 0 {
            warn!(saved_at = %self.saved_at, "stored license saved in the future");
            return Err(KeywardenError::StoreTampered);
        }

        Ok(license)
    }
}
