//! Machine identification and activation matching.
//!
//! The host fingerprint itself (CPU id, disk serials, MAC addresses, ...) is
//! collected by a [`FingerprintProvider`] supplied by the application. This
//! module only hashes it and compares the result against activation entries.
//!
//! Floating activations are recorded with a fixed-width prefix in front of the
//! real machine code:
//!
//! ```text
//! floating:<machine code>            (9 characters)
//! floating_overdraft:<machine code>  (19 characters)
//! ```
//!
//! Matching strips by position, not by prefix text, so the widths are part of
//! the wire contract.

use crate::license::record::ActivationData;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Prefix width of a floating activation id.
pub const FLOATING_PREFIX_LEN: usize = 9;

/// Prefix width of an overdraft floating activation id.
pub const OVERDRAFT_PREFIX_LEN: usize = 19;

/// Prefix the server puts in front of a floating activation id.
pub const FLOATING_PREFIX: &str = "floating:";

/// Prefix the server puts in front of an overdraft floating activation id.
pub const OVERDRAFT_PREFIX: &str = "floating_overdraft:";

/// How a license is bound to machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineBinding {
    /// Permanent activations; any entry may match.
    #[default]
    NodeLocked,
    /// A single leased floating slot.
    Floating {
        /// Accept overdraft slots as well.
        allow_overdraft: bool,
    },
}

/// Source of the raw host fingerprint.
pub trait FingerprintProvider: Send + Sync {
    /// Opaque, stable description of the current machine.
    fn fingerprint(&self) -> String;
}

/// Fingerprint provider returning a fixed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFingerprint(pub String);

impl FingerprintProvider for StaticFingerprint {
    fn fingerprint(&self) -> String {
        self.0.clone()
    }
}

/// Hash applied to the raw fingerprint to produce a machine code.
pub trait MachineHasher {
    /// Hash `data` into a machine code.
    fn hash(&self, data: &str) -> String;
}

/// Lowercase hex SHA-1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hasher;

impl MachineHasher for Sha1Hasher {
    fn hash(&self, data: &str) -> String {
        hex::encode(Sha1::digest(data.as_bytes()))
    }
}

/// Lowercase hex SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl MachineHasher for Sha256Hasher {
    fn hash(&self, data: &str) -> String {
        hex::encode(Sha256::digest(data.as_bytes()))
    }
}

impl<F> MachineHasher for F
where
    F: Fn(&str) -> String,
{
    fn hash(&self, data: &str) -> String {
        self(data)
    }
}

/// Machine code of the current host.
pub fn machine_code(provider: &dyn FingerprintProvider, hasher: &dyn MachineHasher) -> String {
    hasher.hash(&provider.fingerprint())
}

/// Activation id the server records for a floating slot.
pub fn floating_machine_id(machine_code: &str) -> String {
    format!("{}{}", FLOATING_PREFIX, machine_code)
}

/// Activation id the server records for an overdraft floating slot.
pub fn overdraft_machine_id(machine_code: &str) -> String {
    format!("{}{}", OVERDRAFT_PREFIX, machine_code)
}

/// Whether `machine_code` is bound by `activations` under `binding`.
///
/// An empty machine code never matches.
pub fn matches_activation(
    activations: &[ActivationData],
    machine_code: &str,
    binding: MachineBinding,
) -> bool {
    if machine_code.is_empty() {
        return false;
    }

    match binding {
        MachineBinding::NodeLocked => activations.iter().any(|a| a.mid == machine_code),
        MachineBinding::Floating { allow_overdraft } => {
            let [slot] = activations else {
                return false;
            };

            skip_chars(&slot.mid, FLOATING_PREFIX_LEN) == Some(machine_code)
                || (allow_overdraft
                    && skip_chars(&slot.mid, OVERDRAFT_PREFIX_LEN) == Some(machine_code))
        }
    }
}

/// `text` without its first `count` characters.
fn skip_chars(text: &str, count: usize) -> Option<&str> {
    if count == 0 {
        return Some(text);
    }
    match text.char_indices().nth(count) {
        Some((index, _)) => Some(&text[index..]),
        None if text.chars().count() == count => Some(""),
        None => None,
    }
}
