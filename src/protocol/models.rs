//! Wire records exchanged with the licensing server.
//!
//! Two encodings of the same license exist:
//! - [`LegacyKeyInformation`]: a flat record with date strings and a detached
//!   signature over a re-derived canonical text.
//! - [`RawResponse`]: an envelope carrying the exact signed bytes
//!   (`LicenseKey`, base64 of a UTF-8 JSON [`LicenseKeyPI`]) next to their
//!   signature, plus optionally signed [`Metadata`].
//!
//! Field names mirror the server's JSON keys.

#![allow(missing_docs)]

use crate::license::data_object::DataObject;
use crate::KeywardenError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server result code for success.
pub const RESULT_SUCCESS: i32 = 0;

/// Legacy key-information record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyKeyInformation {
    pub valid: bool,
    pub created: String,
    pub expires: String,
    #[serde(deserialize_with = "string_or_number")]
    pub settime: String,
    #[serde(deserialize_with = "string_or_number")]
    pub timeleft: String,
    pub f1: bool,
    pub f2: bool,
    pub f3: bool,
    pub f4: bool,
    pub f5: bool,
    pub f6: bool,
    pub f7: bool,
    pub f8: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub newkey: Option<String>,
}

impl LegacyKeyInformation {
    /// Feature flags in F1..F8 order.
    pub fn features(&self) -> [bool; 8] {
        [
            self.f1, self.f2, self.f3, self.f4, self.f5, self.f6, self.f7, self.f8,
        ]
    }
}

/// Raw-response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawResponse {
    pub result: i32,
    #[serde(default)]
    pub message: Option<String>,
    /// Base64 of the signed license JSON.
    #[serde(default)]
    pub license_key: Option<String>,
    /// Base64 signature over the decoded `license_key` bytes.
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl RawResponse {
    /// The signed license bytes (decoded `LicenseKey`).
    pub fn license_bytes(&self) -> Result<Vec<u8>, KeywardenError> {
        let encoded = self
            .license_key
            .as_deref()
            .ok_or_else(|| KeywardenError::ProtocolError("Response has no license key".to_string()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| KeywardenError::ProtocolError(format!("Invalid license key encoding: {}", e)))
    }
}

/// Envelope metadata, signed separately from the license bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    #[serde(default)]
    pub activated_machines: Option<i64>,
    #[serde(default)]
    pub license_status: Option<LicenseStatus>,
    #[serde(default)]
    pub used_floating_machines: Option<i64>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Server-computed summary of a license's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LicenseStatus {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Platform-independent license record (epoch-second timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LicenseKeyPI {
    pub product_id: i64,
    #[serde(rename = "ID")]
    pub id: i64,
    pub key: String,
    pub created: i64,
    pub expires: i64,
    pub period: i64,
    pub f1: bool,
    pub f2: bool,
    pub f3: bool,
    pub f4: bool,
    pub f5: bool,
    pub f6: bool,
    pub f7: bool,
    pub f8: bool,
    #[serde(default)]
    pub notes: Option<String>,
    pub block: bool,
    #[serde(default)]
    pub global_id: i64,
    #[serde(default)]
    pub customer: Option<CustomerPI>,
    #[serde(default)]
    pub activated_machines: Vec<ActivationDataPI>,
    #[serde(default)]
    pub trial_activation: bool,
    #[serde(default)]
    pub max_no_of_machines: i64,
    #[serde(default)]
    pub allowed_machines: Option<String>,
    #[serde(default)]
    pub data_objects: Vec<DataObject>,
    pub sign_date: i64,
}

/// Platform-independent customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerPI {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    pub created: i64,
}

/// Platform-independent activation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivationDataPI {
    pub mid: String,
    #[serde(rename = "IP", default)]
    pub ip: Option<String>,
    pub time: i64,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

/// License list for a user account, signed as one multi-part payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountLicenseList {
    pub result: i32,
    #[serde(default)]
    pub message: Option<String>,
    /// Base64 of a JSON array of [`LicenseKeyPI`].
    #[serde(default)]
    pub license_keys: Option<String>,
    /// Base64 of a JSON array of [`ActivationDataPI`].
    #[serde(default)]
    pub activated_machines: Option<String>,
    pub sign_date: i64,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Result of a request that returns no license data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BasicResult {
    pub result: i32,
    #[serde(default)]
    pub message: Option<String>,
}

impl BasicResult {
    /// Map the server result code to `Ok` or `ServerError`.
    pub fn into_result(self) -> Result<(), KeywardenError> {
        check_result_code(self.result, self.message)
    }
}

/// A license as received on the wire, in either encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireLicense {
    /// Legacy key information.
    Legacy(LegacyKeyInformation),
    /// Raw-response envelope.
    Envelope(RawResponse),
}

pub(crate) fn check_result_code(result: i32, message: Option<String>) -> Result<(), KeywardenError> {
    if result == RESULT_SUCCESS {
        Ok(())
    } else {
        Err(KeywardenError::ServerError(
            message.unwrap_or_else(|| format!("result code {}", result)),
        ))
    }
}

fn parse_json<'a, T: Deserialize<'a>>(body: &'a [u8], what: &str) -> Result<T, KeywardenError> {
    serde_json::from_slice(body)
        .map_err(|e| KeywardenError::ProtocolError(format!("Failed to parse {}: {}", what, e)))
}

/// Parse a raw-response envelope.
pub fn parse_raw_response(body: &[u8]) -> Result<RawResponse, KeywardenError> {
    parse_json(body, "raw response")
}

/// Parse a legacy key-information record.
pub fn parse_legacy_key_information(body: &[u8]) -> Result<LegacyKeyInformation, KeywardenError> {
    parse_json(body, "key information")
}

/// Parse an account license list.
pub fn parse_account_license_list(body: &[u8]) -> Result<AccountLicenseList, KeywardenError> {
    parse_json(body, "account license list")
}

/// Parse a basic result.
pub fn parse_basic_result(body: &[u8]) -> Result<BasicResult, KeywardenError> {
    parse_json(body, "basic result")
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_RESPONSE: &str = r#"{
        "valid": true,
        "created": "2025-01-01",
        "expires": "2025-01-31",
        "settime": "30",
        "timeleft": 12,
        "f1": true, "f2": false, "f3": false, "f4": false,
        "f5": false, "f6": false, "f7": false, "f8": true,
        "notes": "pro",
        "mid": "",
        "pid": 3349,
        "signature": "c2ln",
        "newkey": null
    }"#;

    const RAW_RESPONSE: &str = r#"{
        "Result": 0,
        "Message": "",
        "LicenseKey": "e30=",
        "Signature": "c2ln",
        "Metadata": {
            "ActivatedMachines": 2,
            "LicenseStatus": { "IsValid": true },
            "UsedFloatingMachines": 1,
            "Signature": "bWV0YQ=="
        }
    }"#;

    const ERROR_RESPONSE: &str = r#"{
        "Result": 1,
        "Message": "Unable to find the license key."
    }"#;

    #[test]
    fn test_parse_legacy_mixed_typing() {
        let info = parse_legacy_key_information(LEGACY_RESPONSE.as_bytes()).unwrap();
        assert!(info.valid);
        assert_eq!(info.settime, "30");
        assert_eq!(info.timeleft, "12");
        assert_eq!(info.pid.as_deref(), Some("3349"));
        assert!(info.uid.is_none());
        assert!(info.newkey.is_none());
        assert_eq!(
            info.features(),
            [true, false, false, false, false, false, false, true]
        );
    }

    #[test]
    fn test_legacy_rejects_bool_as_number() {
        let body = LEGACY_RESPONSE.replace("\"30\"", "true");
        let result = parse_legacy_key_information(body.as_bytes());
        assert!(matches!(result, Err(KeywardenError::ProtocolError(_))));
    }

    #[test]
    fn test_parse_raw_response() {
        let raw = parse_raw_response(RAW_RESPONSE.as_bytes()).unwrap();
        assert_eq!(raw.result, 0);
        assert_eq!(raw.license_key.as_deref(), Some("e30="));
        let metadata = raw.metadata.unwrap();
        assert_eq!(metadata.activated_machines, Some(2));
        assert_eq!(metadata.used_floating_machines, Some(1));
        assert!(metadata.license_status.unwrap().is_valid);
    }

    #[test]
    fn test_parse_error_response() {
        let raw = parse_raw_response(ERROR_RESPONSE.as_bytes()).unwrap();
        assert_eq!(raw.result, 1);
        assert!(raw.license_key.is_none());
        assert!(raw.metadata.is_none());
    }

    #[test]
    fn test_parse_malformed_json() {
        let result = parse_raw_response(b"not json");
        assert!(matches!(result, Err(KeywardenError::ProtocolError(_))));
    }

    #[test]
    fn test_license_key_pi_field_names() {
        let json = serde_json::to_value(crate::test_support::sample_license_pi()).unwrap();
        for field in ["ProductId", "ID", "Key", "F1", "F8", "GlobalId", "SignDate", "MaxNoOfMachines"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        assert!(json["ActivatedMachines"][0].get("IP").is_some());
        assert!(json["Customer"].get("CompanyName").is_some());
    }

    #[test]
    fn test_basic_result_codes() {
        let ok = parse_basic_result(br#"{"Result":0}"#).unwrap();
        assert!(ok.into_result().is_ok());

        let err = parse_basic_result(br#"{"Result":1,"Message":"Access denied."}"#).unwrap();
        assert!(matches!(err.into_result(), Err(KeywardenError::ServerError(m)) if m == "Access denied."));
    }
}
