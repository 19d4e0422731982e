//! Canonical byte encodings of signed license data.
//!
//! Legacy key-information signatures cover a text built by concatenating the
//! signed fields in a fixed order with no separators, encoded as UTF-16LE:
//!
//! ```text
//! valid created expires settime timeleft f1..f8 notes mid [pid] [uid] [date] [customer]
//! ```
//!
//! Booleans render as `True`/`False`, dates as `yyyy-MM-dd`, integers in
//! decimal. Absent text fields render as the empty string. The order is part
//! of the wire contract.
//!
//! Envelope protocols sign opaque server bytes instead; the helpers here only
//! concatenate those parts.

use chrono::NaiveDate;

/// Date format used inside signed legacy text.
pub const SIGNED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Encode text as UTF-16LE code units.
pub fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Boolean rendering used by the signing server.
pub fn bool_text(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Builder for signed legacy text.
#[derive(Debug, Default)]
pub struct CanonicalText {
    text: String,
}

impl CanonicalText {
    /// Start an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a boolean.
    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.text.push_str(bool_text(value));
        self
    }

    /// Append an integer in decimal.
    pub fn push_int(&mut self, value: i64) -> &mut Self {
        self.text.push_str(&value.to_string());
        self
    }

    /// Append a calendar date as `yyyy-MM-dd`.
    pub fn push_date(&mut self, value: NaiveDate) -> &mut Self {
        self.text
            .push_str(&value.format(SIGNED_DATE_FORMAT).to_string());
        self
    }

    /// Append optional text; `None` appends nothing.
    pub fn push_text(&mut self, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.text.push_str(value);
        }
        self
    }

    /// The accumulated text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Final UTF-16LE bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        utf16le(&self.text)
    }
}

/// Borrowed view of every field a legacy key-information signature covers.
///
/// `product_id`, `user_id`, `signed_date` and `customer` are `Some` only when
/// the server was asked to sign them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInformationFields<'a> {
    /// Validity flag reported by the server.
    pub valid: bool,
    /// Creation day.
    pub created: NaiveDate,
    /// Expiration day.
    pub expires: NaiveDate,
    /// Period in days (`settime`).
    pub set_time: i64,
    /// Days remaining when signed (`timeleft`).
    pub time_left: i64,
    /// Feature flags F1..F8.
    pub features: [bool; 8],
    /// Notes.
    pub notes: Option<&'a str>,
    /// Machine id the response was produced for.
    pub machine_id: Option<&'a str>,
    /// Product id text.
    pub product_id: Option<&'a str>,
    /// User id text.
    pub user_id: Option<&'a str>,
    /// Signature date text.
    pub signed_date: Option<&'a str>,
    /// Customer id text.
    pub customer: Option<&'a str>,
}

impl KeyInformationFields<'_> {
    /// Signed text before UTF-16 encoding.
    pub fn canonical_text(&self) -> CanonicalText {
        let mut text = CanonicalText::new();
        text.push_bool(self.valid)
            .push_date(self.created)
            .push_date(self.expires)
            .push_int(self.set_time)
            .push_int(self.time_left);
        for feature in self.features {
            text.push_bool(feature);
        }
        text.push_text(Some(self.notes.unwrap_or_default()))
            .push_text(Some(self.machine_id.unwrap_or_default()))
            .push_text(self.product_id)
            .push_text(self.user_id)
            .push_text(self.signed_date)
            .push_text(self.customer);
        text
    }

    /// Exact bytes the server signed.
    pub fn encode(&self) -> Vec<u8> {
        self.canonical_text().into_bytes()
    }
}

/// Payload of a multi-part account license list.
pub fn account_list_payload(license_bytes: &[u8], machine_bytes: &[u8], sign_date: i64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(license_bytes.len() + machine_bytes.len() + 8);
    payload.extend_from_slice(license_bytes);
    payload.extend_from_slice(machine_bytes);
    payload.extend_from_slice(&sign_date.to_le_bytes());
    payload
}

/// Payload covered by an envelope's metadata signature.
///
/// Binds the metadata to the license bytes it was issued with.
pub fn metadata_payload(
    license_bytes: &[u8],
    activated_machines: Option<i64>,
    used_floating_machines: Option<i64>,
    is_valid: Option<bool>,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(license_bytes.len() + 17);
    payload.extend_from_slice(license_bytes);
    payload.extend_from_slice(&activated_machines.unwrap_or(0).to_le_bytes());
    payload.extend_from_slice(&used_floating_machines.unwrap_or(0).to_le_bytes());
    payload.push(u8::from(is_valid.unwrap_or(false)));
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_fields() -> KeyInformationFields<'static> {
        KeyInformationFields {
            valid: true,
            created: day(2025, 1, 1),
            expires: day(2025, 1, 31),
            set_time: 30,
            time_left: 12,
            features: [true, false, false, false, false, false, false, true],
            notes: Some("pro"),
            machine_id: None,
            product_id: None,
            user_id: None,
            signed_date: None,
            customer: None,
        }
    }

    #[test]
    fn test_utf16le_ascii() {
        assert_eq!(utf16le("Ab"), vec![0x41, 0x00, 0x62, 0x00]);
    }

    #[test]
    fn test_utf16le_non_ascii() {
        // U+00E9 then U+1F600 (surrogate pair D83D DE00)
        assert_eq!(utf16le("é😀"), vec![0xE9, 0x00, 0x3D, 0xD8, 0x00, 0xDE]);
    }

    #[test]
    fn test_canonical_text_field_order() {
        let text = sample_fields().canonical_text();
        assert_eq!(
            text.as_str(),
            "True2025-01-012025-01-313012TrueFalseFalseFalseFalseFalseFalseTruepro"
        );
    }

    #[test]
    fn test_absent_text_fields_are_empty() {
        let mut fields = sample_fields();
        fields.notes = None;
        let text = fields.canonical_text();
        assert!(text.as_str().ends_with("FalseTrue"));
    }

    #[test]
    fn test_optional_signed_fields_appended_in_order() {
        let mut fields = sample_fields();
        fields.machine_id = Some("MID");
        fields.product_id = Some("3349");
        fields.user_id = Some("7");
        fields.signed_date = Some("2025-01-15");
        fields.customer = Some("9");

        let text = fields.canonical_text();
        assert!(text.as_str().ends_with("proMID334972025-01-159"));
    }

    #[test]
    fn test_encode_is_utf16le_of_text() {
        let fields = sample_fields();
        let bytes = fields.encode();
        assert_eq!(bytes, utf16le(fields.canonical_text().as_str()));
        assert_eq!(&bytes[..4], &[b'T', 0, b'r', 0]);
    }

    #[test]
    fn test_encode_deterministic() {
        assert_eq!(sample_fields().encode(), sample_fields().encode());
    }

    #[test]
    fn test_negative_time_left() {
        let mut fields = sample_fields();
        fields.time_left = -3;
        assert!(fields.canonical_text().as_str().contains("30-3True"));
    }

    #[test]
    fn test_account_list_payload_layout() {
        let payload = account_list_payload(b"LK", b"AM", 0x0102_0304);
        assert_eq!(
            payload,
            vec![b'L', b'K', b'A', b'M', 0x04, 0x03, 0x02, 0x01, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_metadata_payload_layout() {
        let payload = metadata_payload(b"x", Some(2), None, Some(true));
        assert_eq!(payload.len(), 1 + 8 + 8 + 1);
        assert_eq!(payload[1], 2);
        assert_eq!(&payload[9..17], &[0u8; 8]);
        assert_eq!(payload[17], 1);
    }
}
