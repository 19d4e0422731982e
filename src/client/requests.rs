//! Typed API requests.
//!
//! Each request names its endpoint and lists its form fields explicitly.
//! Optional fields are omitted when `None`.

use crate::client::Params;
use crate::crypto::canonical::bool_text;

/// A request with a fixed endpoint and explicit form fields.
pub trait ApiRequest {
    /// Endpoint path below `/api/`.
    const ENDPOINT: &'static str;

    /// Form fields in a stable order.
    fn to_params(&self) -> Params;
}

/// Sign method requesting a raw-response envelope.
const SIGN_METHOD_RAW: &str = "1";

fn push_opt(params: &mut Params, name: &'static str, value: Option<impl ToString>) {
    if let Some(value) = value {
        params.push((name, value.to_string()));
    }
}

/// Activate a key on a machine and return a signed license.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivateRequest {
    /// Product id.
    pub product_id: i64,
    /// License key.
    pub key: String,
    /// Machine code to activate.
    pub machine_code: String,
    /// Display name for the activation.
    pub friendly_name: Option<String>,
    /// Lease length in seconds; set for floating activations.
    pub floating_time_interval: Option<u32>,
    /// Overdraft slots allowed for floating activations.
    pub max_overdraft: Option<u32>,
}

impl ApiRequest for ActivateRequest {
    const ENDPOINT: &'static str = "key/Activate";

    fn to_params(&self) -> Params {
        let mut params = vec![
            ("ProductId", self.product_id.to_string()),
            ("Key", self.key.clone()),
            ("MachineCode", self.machine_code.clone()),
        ];
        push_opt(&mut params, "FriendlyName", self.friendly_name.as_deref());
        push_opt(&mut params, "FloatingTimeInterval", self.floating_time_interval);
        push_opt(&mut params, "MaxOverdraft", self.max_overdraft);
        params.push(("Sign", bool_text(true).to_string()));
        params.push(("SignMethod", SIGN_METHOD_RAW.to_string()));
        params
    }
}

/// Fetch a signed license without activating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetKeyRequest {
    /// Product id.
    pub product_id: i64,
    /// License key.
    pub key: String,
}

impl ApiRequest for GetKeyRequest {
    const ENDPOINT: &'static str = "key/GetKey";

    fn to_params(&self) -> Params {
        vec![
            ("ProductId", self.product_id.to_string()),
            ("Key", self.key.clone()),
            ("Sign", bool_text(true).to_string()),
            ("SignMethod", SIGN_METHOD_RAW.to_string()),
        ]
    }
}

/// Release a machine activation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeactivateRequest {
    /// Product id.
    pub product_id: i64,
    /// License key.
    pub key: String,
    /// Machine code to release.
    pub machine_code: String,
    /// Release a floating slot rather than a node-locked activation.
    pub floating: bool,
}

impl ApiRequest for DeactivateRequest {
    const ENDPOINT: &'static str = "key/Deactivate";

    fn to_params(&self) -> Params {
        vec![
            ("ProductId", self.product_id.to_string()),
            ("Key", self.key.clone()),
            ("MachineCode", self.machine_code.clone()),
            ("Floating", bool_text(self.floating).to_string()),
        ]
    }
}

/// Change a data object counter on a license.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntValueChange {
    /// Product id.
    pub product_id: i64,
    /// License key.
    pub key: String,
    /// Data object id.
    pub id: i64,
    /// Amount to add or subtract.
    pub int_value: u32,
    /// Bound the counter must not cross; also enforced by the server.
    pub bound: Option<i64>,
}

impl IntValueChange {
    fn params(&self) -> Params {
        let mut params = vec![
            ("ProductId", self.product_id.to_string()),
            ("Key", self.key.clone()),
            ("Id", self.id.to_string()),
            ("IntValue", self.int_value.to_string()),
        ];
        if let Some(bound) = self.bound {
            params.push(("EnableBound", bool_text(true).to_string()));
            params.push(("Bound", bound.to_string()));
        }
        params
    }
}

/// Increase a counter, optionally up to an upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncrementIntValueRequest(pub IntValueChange);

impl ApiRequest for IncrementIntValueRequest {
    const ENDPOINT: &'static str = "data/IncrementIntValueToKey";

    fn to_params(&self) -> Params {
        self.0.params()
    }
}

/// Decrease a counter, optionally down to a lower bound.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecrementIntValueRequest(pub IntValueChange);

impl ApiRequest for DecrementIntValueRequest {
    const ENDPOINT: &'static str = "data/DecrementIntValueToKey";

    fn to_params(&self) -> Params {
        self.0.params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(params: &Params) -> Vec<&'static str> {
        params.iter().map(|(name, _)| *name).collect()
    }

    #[test]
    fn test_activate_params_node_locked() {
        let request = ActivateRequest {
            product_id: 3349,
            key: "KEY".to_string(),
            machine_code: "abc".to_string(),
            ..Default::default()
        };
        let params = request.to_params();
        assert_eq!(
            names(&params),
            vec!["ProductId", "Key", "MachineCode", "Sign", "SignMethod"]
        );
        assert_eq!(params[0].1, "3349");
        assert_eq!(params[3].1, "True");
    }

    #[test]
    fn test_activate_params_floating() {
        let request = ActivateRequest {
            product_id: 1,
            key: "KEY".to_string(),
            machine_code: "abc".to_string(),
            friendly_name: Some("laptop".to_string()),
            floating_time_interval: Some(300),
            max_overdraft: Some(2),
        };
        let params = request.to_params();
        assert!(params.contains(&("FriendlyName", "laptop".to_string())));
        assert!(params.contains(&("FloatingTimeInterval", "300".to_string())));
        assert!(params.contains(&("MaxOverdraft", "2".to_string())));
    }

    #[test]
    fn test_deactivate_params() {
        let request = DeactivateRequest {
            product_id: 1,
            key: "KEY".to_string(),
            machine_code: "abc".to_string(),
            floating: true,
        };
        assert!(request.to_params().contains(&("Floating", "True".to_string())));
    }

    #[test]
    fn test_int_value_bound_params() {
        let change = IntValueChange {
            product_id: 1,
            key: "KEY".to_string(),
            id: 7,
            int_value: 3,
            bound: None,
        };
        assert_eq!(
            names(&IncrementIntValueRequest(change.clone()).to_params()),
            vec!["ProductId", "Key", "Id", "IntValue"]
        );

        let bounded = DecrementIntValueRequest(IntValueChange {
            bound: Some(0),
            ..change
        });
        let params = bounded.to_params();
        assert!(params.contains(&("EnableBound", "True".to_string())));
        assert!(params.contains(&("Bound", "0".to_string())));
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(ActivateRequest::ENDPOINT, "key/Activate");
        assert_eq!(GetKeyRequest::ENDPOINT, "key/GetKey");
        assert_eq!(DeactivateRequest::ENDPOINT, "key/Deactivate");
        assert_eq!(IncrementIntValueRequest::ENDPOINT, "data/IncrementIntValueToKey");
        assert_eq!(DecrementIntValueRequest::ENDPOINT, "data/DecrementIntValueToKey");
    }
}
