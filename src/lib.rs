//! # Keywarden
//!
//! **Offline license verification for Rust.**
//!
//! Keywarden checks licenses issued by a remote licensing server without
//! trusting anything but the server's RSA public key. A license is accepted
//! only after its signed bytes verify, and then only if it passes a chain of
//! fail-closed checks.
//!
//! ## Features
//!
//! - **Two signed encodings**: legacy key information (SHA-1 over a
//!   canonical UTF-16LE text) and raw-response envelopes (SHA-256 over the
//!   exact server bytes), never interchangeable
//! - **Chainable validation**: the first failed check is kept and every later
//!   check is skipped
//! - **Machine binding**: node-locked, floating and overdraft floating slots
//! - **Authenticated offline store**: stored licenses are re-verified on load
//!   and expire after a grace period
//!
//! ## Quickstart
//!
//! ```no_run
//! use keywarden::{KeywardenConfig, LicenseManager, TransportConfig};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), keywarden::KeywardenError> {
//!     let config = KeywardenConfig {
//!         product_id: 3349,
//!         access_token: "your-access-token",
//!         rsa_public_key: "<RSAKeyValue><Modulus>...</Modulus><Exponent>AQAB</Exponent></RSAKeyValue>",
//!         required_features: &[1],
//!         floating: None,
//!         signature_expiration_days: Some(30),
//!         store_namespace: "myapp-pro",
//!         offline_grace: Duration::from_secs(24 * 60 * 60),
//!         transport: TransportConfig::default(),
//!     };
//!
//!     let manager = LicenseManager::new(config)?;
//!     let result = manager.activate("ICVLD-VVSZR-ZTICT-YKGXL", "machine-code")?;
//!
//!     println!("License valid! (stored: {})", result.from_store);
//!     Ok(())
//! }
//! ```
//!
//! ## Validating a record directly
//!
//! ```no_run
//! # use keywarden::{LicenseKey, PublicKey, SystemClock};
//! # fn check(license: &LicenseKey, key: &PublicKey) -> bool {
//! license
//!     .validate()
//!     .has_valid_signature(key)
//!     .has_not_expired(&SystemClock)
//!     .has_feature(1)
//!     .is_valid()
//! # }
//! ```
//!
//! ## Threat Model
//!
//! Keywarden protects against:
//! - **Spoofed responses**: records that do not verify under the configured key are rejected
//! - **Store tampering**: stored licenses are signature-verified on load
//! - **Clock rollback**: optional network-time check on expiry, and stores saved "in the future" are rejected
//!
//! Keywarden does **not** prevent binary patching or code modification.
//! Client-side licensing can always be bypassed by a determined attacker
//! with access to the binary.

#![warn(missing_docs)]
#![doc(html_root_url = "https://docs.rs/keywarden/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// License layer
pub mod license;

// Client layer
pub mod client;

// Store layer
pub mod store;

// Policy layer
pub mod policy;

// Manager (main public API)
pub mod manager;

#[cfg(test)]
mod test_support;

// Re-exports for public API
pub use clock::{Clock, NetworkTime, SystemClock};
pub use config::{FloatingConfig, KeywardenConfig, TransportConfig};
pub use crypto::key::PublicKey;
pub use crypto::verify::SignatureScheme;
pub use errors::KeywardenError;
pub use license::{LicenseKey, MachineBinding, TrustChain, Validation, ValidationFailure};
pub use manager::{LicenseManager, ValidationResult};
pub use policy::access::AccessPolicy;
pub use protocol::models::WireLicense;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::{MockClock, MockNetworkTime};
