//! Named data objects attached to a license, with bounded counter updates.
//!
//! Counter bounds are enforced before any request leaves the client, so a
//! caller can tell "rejected by the bound" ([`KeywardenError::BoundViolation`])
//! apart from "could not reach the server" ([`KeywardenError::Transport`]).

use crate::KeywardenError;
use serde::{Deserialize, Serialize};

/// A named value stored on a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataObject {
    /// Server-assigned id.
    pub id: i64,
    /// Object name.
    #[serde(default)]
    pub name: Option<String>,
    /// String payload.
    #[serde(default)]
    pub string_value: Option<String>,
    /// Integer payload, used as a counter.
    #[serde(default)]
    pub int_value: i64,
}

impl DataObject {
    /// Value after adding `delta`, if it stays at or below `upper_bound`.
    pub fn checked_increment(&self, delta: u32, upper_bound: Option<i64>) -> Result<i64, KeywardenError> {
        let delta = i64::from(delta);
        let violation = |bound| KeywardenError::BoundViolation {
            current: self.int_value,
            delta,
            bound,
        };

        let next = self
            .int_value
            .checked_add(delta)
            .ok_or_else(|| violation(upper_bound.unwrap_or(i64::MAX)))?;

        match upper_bound {
            Some(bound) if next > bound => Err(violation(bound)),
            _ => Ok(next),
        }
    }

    /// Value after subtracting `delta`, if it stays at or above `lower_bound`.
    pub fn checked_decrement(&self, delta: u32, lower_bound: Option<i64>) -> Result<i64, KeywardenError> {
        let delta = i64::from(delta);
        let violation = |bound| KeywardenError::BoundViolation {
            current: self.int_value,
            delta: -delta,
            bound,
        };

        let next = self
            .int_value
            .checked_sub(delta)
            .ok_or_else(|| violation(lower_bound.unwrap_or(i64::MIN)))?;

        match lower_bound {
            Some(bound) if next < bound => Err(violation(bound)),
            _ => Ok(next),
        }
    }
}
