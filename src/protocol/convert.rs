//! Conversions from wire records to [`LicenseKey`].
//!
//! Every conversion is all-or-nothing: a bad timestamp, base64 field or JSON
//! body fails the whole record.

use crate::crypto::canonical::{account_list_payload, SIGNED_DATE_FORMAT};
use crate::crypto::key::PublicKey;
use crate::crypto::verify::{verify_b64, SignatureScheme};
use crate::license::record::{ActivationData, Customer, LegacySignature, LicenseKey, TrustChain};
use crate::protocol::models::{
    check_result_code, AccountLicenseList, ActivationDataPI, CustomerPI, LegacyKeyInformation,
    LicenseKeyPI, RawResponse, WireLicense,
};
use crate::KeywardenError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tracing::warn;

fn from_epoch(seconds: i64, field: &str) -> Result<DateTime<Utc>, KeywardenError> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        KeywardenError::ProtocolError(format!("{} out of range: {}", field, seconds))
    })
}

impl TryFrom<CustomerPI> for Customer {
    type Error = KeywardenError;

    fn try_from(pi: CustomerPI) -> Result<Self, Self::Error> {
        Ok(Customer {
            id: pi.id,
            name: pi.name,
            email: pi.email,
            company_name: pi.company_name,
            created: from_epoch(pi.created, "Customer.Created")?,
        })
    }
}

impl From<&Customer> for CustomerPI {
    fn from(customer: &Customer) -> Self {
        CustomerPI {
            id: customer.id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            company_name: customer.company_name.clone(),
            created: customer.created.timestamp(),
        }
    }
}

impl TryFrom<ActivationDataPI> for ActivationData {
    type Error = KeywardenError;

    fn try_from(pi: ActivationDataPI) -> Result<Self, Self::Error> {
        Ok(ActivationData {
            mid: pi.mid,
            ip: pi.ip,
            time: from_epoch(pi.time, "ActivatedMachines.Time")?,
            friendly_name: pi.friendly_name,
        })
    }
}

impl From<&ActivationData> for ActivationDataPI {
    fn from(activation: &ActivationData) -> Self {
        ActivationDataPI {
            mid: activation.mid.clone(),
            ip: activation.ip.clone(),
            time: activation.time.timestamp(),
            friendly_name: activation.friendly_name.clone(),
        }
    }
}

/// Converts to a transport-trusted record.
impl TryFrom<LicenseKeyPI> for LicenseKey {
    type Error = KeywardenError;

    fn try_from(pi: LicenseKeyPI) -> Result<Self, Self::Error> {
        let features = [pi.f1, pi.f2, pi.f3, pi.f4, pi.f5, pi.f6, pi.f7, pi.f8];

        Ok(LicenseKey {
            product_id: pi.product_id,
            id: pi.id,
            key: pi.key,
            created: from_epoch(pi.created, "Created")?,
            expires: from_epoch(pi.expires, "Expires")?,
            period: pi.period,
            features,
            notes: pi.notes,
            block: pi.block,
            global_id: pi.global_id,
            customer: pi.customer.map(Customer::try_from).transpose()?,
            activated_machines: pi
                .activated_machines
                .into_iter()
                .map(ActivationData::try_from)
                .collect::<Result<_, _>>()?,
            trial_activation: pi.trial_activation,
            max_no_of_machines: pi.max_no_of_machines,
            allowed_machines: pi.allowed_machines,
            data_objects: pi.data_objects,
            sign_date: from_epoch(pi.sign_date, "SignDate")?,
            trust: TrustChain::Transport,
        })
    }
}

impl LicenseKey {
    /// Platform-independent wire form of this record.
    pub fn to_pi(&self) -> LicenseKeyPI {
        let [f1, f2, f3, f4, f5, f6, f7, f8] = self.features;

        LicenseKeyPI {
            product_id: self.product_id,
            id: self.id,
            key: self.key.clone(),
            created: self.created.timestamp(),
            expires: self.expires.timestamp(),
            period: self.period,
            f1,
            f2,
            f3,
            f4,
            f5,
            f6,
            f7,
            f8,
            notes: self.notes.clone(),
            block: self.block,
            global_id: self.global_id,
            customer: self.customer.as_ref().map(CustomerPI::from),
            activated_machines: self.activated_machines.iter().map(ActivationDataPI::from).collect(),
            trial_activation: self.trial_activation,
            max_no_of_machines: self.max_no_of_machines,
            allowed_machines: self.allowed_machines.clone(),
            data_objects: self.data_objects.clone(),
            sign_date: self.sign_date.timestamp(),
        }
    }

    /// Verify a raw-response envelope and build the record from its signed
    /// bytes. The envelope stays on the record for later re-verification.
    pub fn from_envelope(raw: RawResponse, key: &PublicKey) -> Result<Self, KeywardenError> {
        check_result_code(raw.result, raw.message.clone())?;

        let bytes = raw.license_bytes()?;
        let signature = raw.signature.as_deref().ok_or(KeywardenError::SignatureInvalid)?;
        if !verify_b64(&bytes, signature, key, SignatureScheme::Pkcs1v15Sha256) {
            return Err(KeywardenError::SignatureInvalid);
        }

        Self::from_envelope_bytes(&bytes, raw)
    }

    /// Build the record from an envelope received over a trusted transport,
    /// without checking its signature.
    ///
    /// The envelope is kept, so [`is_genuine`](Self::is_genuine) can still
    /// verify it later.
    pub fn from_envelope_unverified(raw: RawResponse) -> Result<Self, KeywardenError> {
        check_result_code(raw.result, raw.message.clone())?;
        let bytes = raw.license_bytes()?;
        Self::from_envelope_bytes(&bytes, raw)
    }

    fn from_envelope_bytes(bytes: &[u8], raw: RawResponse) -> Result<Self, KeywardenError> {
        let pi: LicenseKeyPI = parse_decoded(bytes, "license key")?;
        let mut license = LicenseKey::try_from(pi)?;
        license.trust = TrustChain::Envelope(raw);
        Ok(license)
    }

    /// Build the record from legacy key information.
    ///
    /// Legacy records carry no key string unless the server issued a
    /// replacement (`newkey`). Without a signed `date`, the signature date is
    /// the Unix epoch, which fails any signature interval check. A signed
    /// `mid` is the record's single activation.
    pub fn from_legacy(info: LegacyKeyInformation) -> Result<Self, KeywardenError> {
        let created = parse_legacy_date(&info.created, "created")?;
        let expires = parse_legacy_date(&info.expires, "expires")?;
        let period = parse_legacy_int(&info.settime, "settime")?;
        let time_left = parse_legacy_int(&info.timeleft, "timeleft")?;

        let features = info.features();
        let legacy = LegacySignature {
            valid: info.valid,
            time_left,
            machine_id: info.mid,
            product_id: info.pid,
            user_id: info.uid,
            signed_date: info.date,
            customer: info.customer,
            signature: info.signature,
        };
        let LegacyBindings {
            product_id,
            sign_date,
            activated_machines,
        } = legacy.bindings()?;
        let trust = TrustChain::Legacy(legacy);

        Ok(LicenseKey {
            product_id,
            id: 0,
            key: info.newkey.unwrap_or_default(),
            created,
            expires,
            period,
            features,
            notes: info.notes,
            block: false,
            global_id: 0,
            customer: None,
            activated_machines,
            trial_activation: false,
            max_no_of_machines: 0,
            allowed_machines: None,
            data_objects: Vec::new(),
            sign_date,
            trust,
        })
    }

    /// [`from_legacy`](Self::from_legacy), rejecting records whose signature
    /// does not verify.
    pub fn from_legacy_verified(info: LegacyKeyInformation, key: &PublicKey) -> Result<Self, KeywardenError> {
        let license = Self::from_legacy(info)?;
        if license.is_genuine(key) {
            Ok(license)
        } else {
            warn!("legacy key information failed verification");
            Err(KeywardenError::SignatureInvalid)
        }
    }
}

/// Record fields a legacy signature covers only as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LegacyBindings {
    pub product_id: i64,
    pub sign_date: DateTime<Utc>,
    pub activated_machines: Vec<ActivationData>,
}

impl LegacySignature {
    /// Product id, signature date and activation implied by the signed
    /// `pid`, `date` and `mid` text.
    ///
    /// A signed `mid` becomes the only activation, stamped with the
    /// signature date.
    pub(crate) fn bindings(&self) -> Result<LegacyBindings, KeywardenError> {
        let product_id = match self.product_id.as_deref() {
            Some(pid) => parse_legacy_int(pid, "pid")?,
            None => 0,
        };
        let sign_date = match self.signed_date.as_deref() {
            Some(date) => parse_legacy_date(date, "date")?,
            None => DateTime::UNIX_EPOCH,
        };
        let activated_machines = self
            .machine_id
            .iter()
            .filter(|mid| !mid.is_empty())
            .map(|mid| ActivationData {
                mid: mid.clone(),
                ip: None,
                time: sign_date,
                friendly_name: None,
            })
            .collect();

        Ok(LegacyBindings {
            product_id,
            sign_date,
            activated_machines,
        })
    }
}

impl LicenseKey {
    /// The signed wire payload behind this record, if it has one.
    ///
    /// Legacy dates are re-rendered as `yyyy-MM-dd`, which is all the
    /// signature covers.
    pub fn to_wire(&self) -> Option<WireLicense> {
        match &self.trust {
            TrustChain::Transport => None,
            TrustChain::Envelope(raw) => Some(WireLicense::Envelope(raw.clone())),
            TrustChain::Legacy(legacy) => {
                let [f1, f2, f3, f4, f5, f6, f7, f8] = self.features;
                Some(WireLicense::Legacy(LegacyKeyInformation {
                    valid: legacy.valid,
                    created: self.created.format(SIGNED_DATE_FORMAT).to_string(),
                    expires: self.expires.format(SIGNED_DATE_FORMAT).to_string(),
                    settime: self.period.to_string(),
                    timeleft: legacy.time_left.to_string(),
                    f1,
                    f2,
                    f3,
                    f4,
                    f5,
                    f6,
                    f7,
                    f8,
                    notes: self.notes.clone(),
                    mid: legacy.machine_id.clone(),
                    pid: legacy.product_id.clone(),
                    uid: legacy.user_id.clone(),
                    date: legacy.signed_date.clone(),
                    customer: legacy.customer.clone(),
                    signature: legacy.signature.clone(),
                    newkey: (!self.key.is_empty()).then(|| self.key.clone()),
                }))
            }
        }
    }
}

impl WireLicense {
    /// Convert without signature checks (transport-trusted input).
    pub fn into_license(self) -> Result<LicenseKey, KeywardenError> {
        match self {
            WireLicense::Legacy(info) => LicenseKey::from_legacy(info),
            WireLicense::Envelope(raw) => LicenseKey::from_envelope_unverified(raw),
        }
    }

    /// Convert, requiring the signature to verify under `key`.
    pub fn into_verified_license(self, key: &PublicKey) -> Result<LicenseKey, KeywardenError> {
        match self {
            WireLicense::Legacy(info) => LicenseKey::from_legacy_verified(info, key),
            WireLicense::Envelope(raw) => LicenseKey::from_envelope(raw, key),
        }
    }
}

/// Verified contents of an [`AccountLicenseList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLicenses {
    /// Licenses owned by the account.
    pub licenses: Vec<LicenseKey>,
    /// Machines activated across those licenses.
    pub activated_machines: Vec<ActivationData>,
    /// When the list was signed.
    pub sign_date: DateTime<Utc>,
}

impl AccountLicenseList {
    /// Verify the multi-part signature and decode the list.
    ///
    /// The individual licenses are transport-trusted: the list signature
    /// does not make each one genuine on its own.
    pub fn verify(self, key: &PublicKey) -> Result<AccountLicenses, KeywardenError> {
        check_result_code(self.result, self.message)?;

        let license_bytes = decode_b64(self.license_keys.as_deref().unwrap_or_default(), "LicenseKeys")?;
        let machine_bytes = decode_b64(
            self.activated_machines.as_deref().unwrap_or_default(),
            "ActivatedMachines",
        )?;

        let signature = self.signature.as_deref().ok_or(KeywardenError::SignatureInvalid)?;
        let payload = account_list_payload(&license_bytes, &machine_bytes, self.sign_date);
        if !verify_b64(&payload, signature, key, SignatureScheme::Pkcs1v15Sha512) {
            return Err(KeywardenError::SignatureInvalid);
        }

        let licenses: Vec<LicenseKeyPI> = parse_decoded_or_empty(&license_bytes, "license keys")?;
        let machines: Vec<ActivationDataPI> = parse_decoded_or_empty(&machine_bytes, "activated machines")?;

        Ok(AccountLicenses {
            licenses: licenses
                .into_iter()
                .map(LicenseKey::try_from)
                .collect::<Result<_, _>>()?,
            activated_machines: machines
                .into_iter()
                .map(ActivationData::try_from)
                .collect::<Result<_, _>>()?,
            sign_date: from_epoch(self.sign_date, "SignDate")?,
        })
    }
}

fn decode_b64(value: &str, field: &str) -> Result<Vec<u8>, KeywardenError> {
    STANDARD
        .decode(value)
        .map_err(|e| KeywardenError::ProtocolError(format!("Invalid {} encoding: {}", field, e)))
}

fn parse_decoded<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, KeywardenError> {
    serde_json::from_slice(bytes)
        .map_err(|e| KeywardenError::ProtocolError(format!("Failed to parse {}: {}", what, e)))
}

fn parse_decoded_or_empty<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<Vec<T>, KeywardenError> {
    if bytes.is_empty() {
        Ok(Vec::new())
    } else {
        parse_decoded(bytes, what)
    }
}

fn parse_legacy_date(text: &str, field: &str) -> Result<DateTime<Utc>, KeywardenError> {
    let day = text
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, SIGNED_DATE_FORMAT).ok())
        .ok_or_else(|| KeywardenError::ProtocolError(format!("Invalid {} date: {:?}", field, text)))?;
    Ok(day.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn parse_legacy_int(text: &str, field: &str) -> Result<i64, KeywardenError> {
    text.trim()
        .parse()
        .map_err(|_| KeywardenError::ProtocolError(format!("Invalid {} value: {:?}", field, text)))
}
