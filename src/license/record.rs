//! The in-memory license record and its trust chain.

use crate::clock::Clock;
use crate::crypto::canonical::{metadata_payload, KeyInformationFields};
use crate::crypto::key::PublicKey;
use crate::crypto::verify::{verify_b64, SignatureScheme};
use crate::license::data_object::DataObject;
use crate::license::validate::Validation;
use crate::protocol::models::{Metadata, RawResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of feature flags on a license.
pub const FEATURE_COUNT: usize = 8;

/// One license key's state as known to the client.
///
/// Timestamps are UTC. Whether the record can be trusted offline depends on
/// [`LicenseKey::trust`]; see [`LicenseKey::is_genuine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseKey {
    /// Product the key belongs to.
    pub product_id: i64,
    /// Numeric key id.
    pub id: i64,
    /// Key string.
    pub key: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Expiration time.
    pub expires: DateTime<Utc>,
    /// Validity period in days.
    pub period: i64,
    /// Feature flags F1..F8 (index 0 is F1).
    pub features: [bool; FEATURE_COUNT],
    /// Free-text notes.
    pub notes: Option<String>,
    /// Whether the key is blocked.
    pub block: bool,
    /// Global id across products.
    pub global_id: i64,
    /// Owning customer, if any.
    pub customer: Option<Customer>,
    /// Activations in server order.
    pub activated_machines: Vec<ActivationData>,
    /// Whether the key was created by a trial activation.
    pub trial_activation: bool,
    /// Maximum permitted machine count.
    pub max_no_of_machines: i64,
    /// Allow-list pattern for machine codes.
    pub allowed_machines: Option<String>,
    /// Named data objects in server order.
    pub data_objects: Vec<DataObject>,
    /// When the server signed this record.
    pub sign_date: DateTime<Utc>,
    /// Where the record came from and how it can be re-verified.
    pub trust: TrustChain,
}

/// Customer attached to a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer id.
    pub id: i64,
    /// Display name.
    pub name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Company name.
    pub company_name: Option<String>,
    /// When the customer was created.
    pub created: DateTime<Utc>,
}

/// One machine activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationData {
    /// Machine code (possibly with a floating prefix).
    pub mid: String,
    /// Client IP at activation.
    pub ip: Option<String>,
    /// Activation time.
    pub time: DateTime<Utc>,
    /// User-assigned machine name.
    pub friendly_name: Option<String>,
}

/// Provenance of a record, which decides how genuineness is checked.
///
/// The variants are separate trust chains: a legacy record is only ever
/// checked against its re-derived canonical text, an envelope record only
/// against the server bytes it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrustChain {
    /// Deserialized from a transport-trusted response. Never genuine offline.
    Transport,
    /// Legacy key information with a detached signature.
    Legacy(LegacySignature),
    /// Raw-response envelope carrying the exact signed bytes.
    Envelope(RawResponse),
}

impl TrustChain {
    /// Signature scheme for this protocol, if it has one.
    pub fn scheme(&self) -> Option<SignatureScheme> {
        match self {
            TrustChain::Transport => None,
            TrustChain::Legacy(_) => Some(SignatureScheme::Pkcs1v15Sha1),
            TrustChain::Envelope(_) => Some(SignatureScheme::Pkcs1v15Sha256),
        }
    }
}

/// Legacy-only signed fields that have no home on [`LicenseKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySignature {
    /// Validity flag as reported by the server.
    pub valid: bool,
    /// `timeleft` at signing time.
    pub time_left: i64,
    /// `mid` the response was produced for.
    pub machine_id: Option<String>,
    /// Signed `pid` text.
    pub product_id: Option<String>,
    /// Signed `uid` text.
    pub user_id: Option<String>,
    /// Signed `date` text.
    pub signed_date: Option<String>,
    /// Signed `customer` text.
    pub customer: Option<String>,
    /// Base64 signature.
    pub signature: Option<String>,
}

impl LicenseKey {
    /// Feature flag `n` (1-based). `None` outside 1..=8.
    pub fn feature(&self, n: usize) -> Option<bool> {
        if (1..=FEATURE_COUNT).contains(&n) {
            Some(self.features[n - 1])
        } else {
            None
        }
    }

    /// Calendar days until expiry; negative once expired, 0 on the expiry day.
    pub fn days_left(&self, clock: &dyn Clock) -> i64 {
        (self.expires.date_naive() - clock.today()).num_days()
    }

    /// Like [`days_left`](Self::days_left) but never below zero.
    pub fn days_left_or_zero(&self, clock: &dyn Clock) -> i64 {
        self.days_left(clock).max(0)
    }

    /// Start a validation chain over this record.
    pub fn validate(&self) -> Validation<'_> {
        Validation::new(self)
    }

    /// Replace every field, trust chain included, with `fresh`.
    pub fn refresh(&mut self, fresh: LicenseKey) {
        *self = fresh;
    }

    /// Whether the record's signed fields verify against `key`.
    ///
    /// Computed from the current field values on every call.
    pub fn is_genuine(&self, key: &PublicKey) -> bool {
        match &self.trust {
            TrustChain::Transport => false,
            TrustChain::Legacy(legacy) => self.legacy_is_genuine(legacy, key),
            TrustChain::Envelope(raw) => self.envelope_is_genuine(raw, key),
        }
    }

    /// Canonical legacy fields, taken from the current record values.
    pub fn legacy_fields<'a>(&'a self, legacy: &'a LegacySignature) -> KeyInformationFields<'a> {
        KeyInformationFields {
            valid: legacy.valid,
            created: self.created.date_naive(),
            expires: self.expires.date_naive(),
            set_time: self.period,
            time_left: legacy.time_left,
            features: self.features,
            notes: self.notes.as_deref(),
            machine_id: legacy.machine_id.as_deref(),
            product_id: legacy.product_id.as_deref(),
            user_id: legacy.user_id.as_deref(),
            signed_date: legacy.signed_date.as_deref(),
            customer: legacy.customer.as_deref(),
        }
    }

    fn legacy_is_genuine(&self, legacy: &LegacySignature, key: &PublicKey) -> bool {
        let Some(signature) = legacy.signature.as_deref() else {
            return false;
        };

        // Parsed copies of signed text must still agree with it.
        let Ok(bound) = legacy.bindings() else {
            return false;
        };
        if self.product_id != bound.product_id
            || self.sign_date != bound.sign_date
            || self.activated_machines != bound.activated_machines
        {
            warn!(key_id = self.id, "legacy record differs from its signed text");
            return false;
        }

        let payload = self.legacy_fields(legacy).encode();
        verify_b64(&payload, signature, key, SignatureScheme::Pkcs1v15Sha1)
    }

    fn envelope_is_genuine(&self, raw: &RawResponse, key: &PublicKey) -> bool {
        match LicenseKey::from_envelope(raw.clone(), key) {
            Ok(signed) => signed == *self,
            Err(e) => {
                warn!(error = %e, key_id = self.id, "envelope did not verify");
                false
            }
        }
    }

    /// Envelope metadata, if present and its own signature verifies.
    pub fn verified_metadata(&self, key: &PublicKey) -> Option<&Metadata> {
        let TrustChain::Envelope(raw) = &self.trust else {
            return None;
        };
        let metadata = raw.metadata.as_ref()?;
        let signature = metadata.signature.as_deref()?;
        let license_bytes = raw.license_bytes().ok()?;

        let payload = metadata_payload(
            &license_bytes,
            metadata.activated_machines,
            metadata.used_floating_machines,
            metadata.license_status.as_ref().map(|s| s.is_valid),
        );

        if verify_b64(&payload, signature, key, SignatureScheme::Pkcs1v15Sha256) {
            Some(metadata)
        } else {
            warn!(key_id = self.id, "metadata signature rejected");
            None
        }
    }
}
