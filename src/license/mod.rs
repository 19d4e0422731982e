//! License records, machine binding and validation predicates.

pub mod data_object;
pub mod machine;
pub mod record;
pub mod validate;

pub use data_object::DataObject;
pub use machine::{FingerprintProvider, MachineBinding, MachineHasher};
pub use record::{ActivationData, Customer, LegacySignature, LicenseKey, TrustChain};
pub use validate::{Validation, ValidationFailure};
