//! Licensing API calls.
//!
//! Each call sends one typed request through a [`Transport`] and parses the
//! reply. There are no retries: a failed call is reported as-is.

use crate::client::requests::{
    ActivateRequest, ApiRequest, DeactivateRequest, DecrementIntValueRequest, GetKeyRequest,
    IncrementIntValueRequest,
};
use crate::client::Transport;
use crate::license::data_object::DataObject;
use crate::protocol::models::{check_result_code, parse_basic_result, parse_raw_response, RawResponse};
use crate::KeywardenError;
use tracing::debug;

fn send<R: ApiRequest>(
    transport: &dyn Transport,
    access_token: &str,
    request: &R,
) -> Result<Vec<u8>, KeywardenError> {
    debug!(endpoint = R::ENDPOINT, "sending licensing request");
    transport.send_request(R::ENDPOINT, &request.to_params(), access_token)
}

fn send_for_license<R: ApiRequest>(
    transport: &dyn Transport,
    access_token: &str,
    request: &R,
) -> Result<RawResponse, KeywardenError> {
    let body = send(transport, access_token, request)?;
    let raw = parse_raw_response(&body)?;
    check_result_code(raw.result, raw.message.clone())?;
    Ok(raw)
}

fn send_basic<R: ApiRequest>(
    transport: &dyn Transport,
    access_token: &str,
    request: &R,
) -> Result<(), KeywardenError> {
    let body = send(transport, access_token, request)?;
    parse_basic_result(&body)?.into_result()
}

/// Activate a key on a machine. The returned envelope is not yet verified.
pub fn activate(
    transport: &dyn Transport,
    access_token: &str,
    request: &ActivateRequest,
) -> Result<RawResponse, KeywardenError> {
    send_for_license(transport, access_token, request)
}

/// Fetch a key's current state. The returned envelope is not yet verified.
pub fn get_key(
    transport: &dyn Transport,
    access_token: &str,
    request: &GetKeyRequest,
) -> Result<RawResponse, KeywardenError> {
    send_for_license(transport, access_token, request)
}

/// Release a machine activation.
pub fn deactivate(
    transport: &dyn Transport,
    access_token: &str,
    request: &DeactivateRequest,
) -> Result<(), KeywardenError> {
    send_basic(transport, access_token, request)
}

/// Increase `object` on the server, checking the request's bound first.
///
/// Returns the expected new value. A bound violation is reported before
/// anything is sent.
pub fn increment_int_value(
    transport: &dyn Transport,
    access_token: &str,
    object: &DataObject,
    request: &IncrementIntValueRequest,
) -> Result<i64, KeywardenError> {
    let next = object.checked_increment(request.0.int_value, request.0.bound)?;
    send_basic(transport, access_token, request)?;
    Ok(next)
}

/// Decrease `object` on the server, checking the request's bound first.
///
/// Returns the expected new value. A bound violation is reported before
/// anything is sent.
pub fn decrement_int_value(
    transport: &dyn Transport,
    access_token: &str,
    object: &DataObject,
    request: &DecrementIntValueRequest,
) -> Result<i64, KeywardenError> {
    let next = object.checked_decrement(request.0.int_value, request.0.bound)?;
    send_basic(transport, access_token, request)?;
    Ok(next)
}
