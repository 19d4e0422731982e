//! Protocol layer: wire records and their conversion to license records.

pub mod convert;
pub mod models;

pub use convert::AccountLicenses;
pub use models::{
    AccountLicenseList, BasicResult, LegacyKeyInformation, LicenseKeyPI, Metadata, RawResponse,
    WireLicense,
};
