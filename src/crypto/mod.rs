//! Cryptographic primitives for license verification.

pub mod canonical;
pub mod key;
pub mod verify;
