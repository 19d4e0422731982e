//! Access policy enforcement.
//!
//! This module enforces access policies based on:
//! - Block status and expiration
//! - Required feature flags (all must be enabled)
//! - Machine binding (node-locked or floating)
//! - Signature genuineness, optionally with a maximum signature age

use crate::clock::Clock;
use crate::config::KeywardenConfig;
use crate::crypto::key::PublicKey;
use crate::license::machine::MachineBinding;
use crate::license::record::LicenseKey;
use crate::KeywardenError;

/// What a license must satisfy to grant access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Feature indices (1..=8) that must all be enabled.
    pub required_features: Vec<usize>,
    /// How the license is bound to machines.
    pub binding: MachineBinding,
    /// Maximum signature age in days.
    pub signature_expiration_days: Option<u32>,
}

impl AccessPolicy {
    /// Policy derived from product configuration.
    pub fn from_config(config: &KeywardenConfig) -> Self {
        let binding = match config.floating {
            Some(floating) => MachineBinding::Floating {
                allow_overdraft: floating.max_overdraft > 0,
            },
            None => MachineBinding::NodeLocked,
        };

        Self {
            required_features: config.required_features.to_vec(),
            binding,
            signature_expiration_days: config.signature_expiration_days,
        }
    }
}

/// Per-call inputs to an access check.
#[derive(Clone, Copy)]
pub struct AccessContext<'a> {
    /// Server verification key.
    pub public_key: &'a PublicKey,
    /// Machine code of the current host.
    pub machine_code: &'a str,
    /// Time source for expiry and signature age.
    pub clock: &'a dyn Clock,
}

/// Check that a license meets all access requirements.
///
/// # Returns
/// * `Ok(())` - Access granted
/// * `Err(Validation(..))` - The first check that failed
pub fn check_access(
    license: &LicenseKey,
    policy: &AccessPolicy,
    ctx: AccessContext<'_>,
) -> Result<(), KeywardenError> {
    let mut chain = license
        .validate()
        .is_not_blocked()
        .has_not_expired(ctx.clock);

    for &feature in &policy.required_features {
        chain = chain.has_feature(feature);
    }

    chain = chain.is_on_right_machine(ctx.machine_code, policy.binding);

    chain = match policy.signature_expiration_days {
        Some(days) => chain.has_valid_signature_within(ctx.public_key, days, ctx.clock),
        None => chain.has_valid_signature(ctx.public_key),
    };

    chain.into_result().map(|_| ()).map_err(KeywardenError::from)
}
