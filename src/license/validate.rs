//! Chainable license predicates.
//!
//! A [`Validation`] threads either the license or the first failure through a
//! sequence of checks. Once a check fails, every later check is skipped and
//! the original failure is kept:
//!
//! ```ignore
//! let ok = license
//!     .validate()
//!     .has_feature(1)
//!     .has_not_expired(&SystemClock)
//!     .has_valid_signature(&public_key)
//!     .is_valid();
//! ```

use crate::clock::{Clock, NetworkTime};
use crate::crypto::key::PublicKey;
use crate::license::machine::{matches_activation, MachineBinding};
use crate::license::record::LicenseKey;
use std::fmt;
use tracing::debug;

/// The check that rejected a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationFailure {
    /// There was no license to check.
    NoLicense,
    /// Expiration date is before today.
    Expired,
    /// Local date disagrees with network time, or network time is unavailable.
    ClockTampered,
    /// Feature index outside 1..=8.
    FeatureOutOfRange,
    /// Required feature flag is off.
    FeatureMissing,
    /// Excluded feature flag is on.
    FeaturePresent,
    /// License is blocked.
    Blocked,
    /// License is expected to be blocked but is not.
    NotBlocked,
    /// Signed fields do not verify.
    InvalidSignature,
    /// Signature is older than the allowed interval.
    SignatureExpired,
    /// Machine code is not among the activations.
    WrongMachine,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValidationFailure::NoLicense => "no license",
            ValidationFailure::Expired => "license has expired",
            ValidationFailure::ClockTampered => "local clock could not be confirmed",
            ValidationFailure::FeatureOutOfRange => "feature index out of range",
            ValidationFailure::FeatureMissing => "required feature not enabled",
            ValidationFailure::FeaturePresent => "excluded feature enabled",
            ValidationFailure::Blocked => "license is blocked",
            ValidationFailure::NotBlocked => "license is not blocked",
            ValidationFailure::InvalidSignature => "license signature invalid",
            ValidationFailure::SignatureExpired => "license signature too old",
            ValidationFailure::WrongMachine => "license not activated on this machine",
        };
        f.write_str(text)
    }
}

/// A license threaded through a chain of checks.
#[must_use = "a validation chain does nothing until its outcome is inspected"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation<'a> {
    outcome: Result<&'a LicenseKey, ValidationFailure>,
}

impl<'a> From<&'a LicenseKey> for Validation<'a> {
    fn from(license: &'a LicenseKey) -> Self {
        Self::new(license)
    }
}

impl<'a> Validation<'a> {
    /// Start a chain over `license`.
    pub fn new(license: &'a LicenseKey) -> Self {
        Self {
            outcome: Ok(license),
        }
    }

    /// Start a chain over a license that may be missing.
    pub fn from_option(license: Option<&'a LicenseKey>) -> Self {
        Self {
            outcome: license.ok_or(ValidationFailure::NoLicense),
        }
    }

    /// Apply `check` unless an earlier check already failed.
    fn check(self, failure: ValidationFailure, check: impl FnOnce(&LicenseKey) -> bool) -> Self {
        match self.outcome {
            Ok(license) if check(license) => self,
            Ok(license) => {
                debug!(key_id = license.id, %failure, "license check failed");
                Self {
                    outcome: Err(failure),
                }
            }
            Err(_) => self,
        }
    }

    /// Expiration day is today or later.
    pub fn has_not_expired(self, clock: &dyn Clock) -> Self {
        let today = clock.today();
        self.check(ValidationFailure::Expired, |license| {
            license.expires.date_naive() >= today
        })
    }

    /// Like [`has_not_expired`](Self::has_not_expired), but first confirms the
    /// local date against `network`. An unreachable source fails.
    pub fn has_not_expired_checked(self, clock: &dyn Clock, network: &dyn NetworkTime) -> Self {
        let today = clock.today();
        self.check(ValidationFailure::ClockTampered, |_| {
            network
                .network_now()
                .is_some_and(|now| now.date_naive() == today)
        })
        .has_not_expired(clock)
    }

    /// Feature `n` (1-based) is enabled.
    pub fn has_feature(self, n: usize) -> Self {
        self.feature_is(n, true, ValidationFailure::FeatureMissing)
    }

    /// Feature `n` (1-based) is disabled.
    pub fn has_not_feature(self, n: usize) -> Self {
        self.feature_is(n, false, ValidationFailure::FeaturePresent)
    }

    fn feature_is(self, n: usize, expected: bool, failure: ValidationFailure) -> Self {
        self.check(ValidationFailure::FeatureOutOfRange, |license| {
            license.feature(n).is_some()
        })
        .check(failure, |license| license.feature(n) == Some(expected))
    }

    /// License is blocked.
    pub fn is_blocked(self) -> Self {
        self.check(ValidationFailure::NotBlocked, |license| license.block)
    }

    /// License is not blocked.
    pub fn is_not_blocked(self) -> Self {
        self.check(ValidationFailure::Blocked, |license| !license.block)
    }

    /// Signed fields verify against `key`.
    pub fn has_valid_signature(self, key: &PublicKey) -> Self {
        self.check(ValidationFailure::InvalidSignature, |license| {
            license.is_genuine(key)
        })
    }

    /// Signed fields verify, and the signature is younger than
    /// `interval_days` whole days.
    pub fn has_valid_signature_within(self, key: &PublicKey, interval_days: u32, clock: &dyn Clock) -> Self {
        let today = clock.today();
        self.has_valid_signature(key)
            .check(ValidationFailure::SignatureExpired, |license| {
                (today - license.sign_date.date_naive()).num_days() < i64::from(interval_days)
            })
    }

    /// `machine_code` is activated under `binding`.
    pub fn is_on_right_machine(self, machine_code: &str, binding: MachineBinding) -> Self {
        self.check(ValidationFailure::WrongMachine, |license| {
            matches_activation(&license.activated_machines, machine_code, binding)
        })
    }

    /// Every check so far passed.
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The license, if every check passed.
    pub fn license(&self) -> Option<&'a LicenseKey> {
        self.outcome.ok()
    }

    /// The first failed check, if any.
    pub fn failure(&self) -> Option<ValidationFailure> {
        self.outcome.err()
    }

    /// Finish the chain.
    pub fn into_result(self) -> Result<&'a LicenseKey, ValidationFailure> {
        self.outcome
    }
}
