//! Client layer: the transport seam, typed requests and API calls.
//!
//! The verification core never speaks HTTP. It receives wire records from
//! whatever implements [`Transport`]; [`http::HttpTransport`] is the default.

pub mod api;
pub mod http;
pub mod requests;

use crate::KeywardenError;

/// Form parameters of one request, in declaration order.
pub type Params = Vec<(&'static str, String)>;

/// Sends one API request and returns the raw response body.
pub trait Transport: Send + Sync {
    /// POST `params` to `endpoint`, authenticated with `access_token`.
    ///
    /// Network failures must be reported as [`KeywardenError::Transport`]
    /// so callers can tell them apart from server-side rejections.
    fn send_request(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
        access_token: &str,
    ) -> Result<Vec<u8>, KeywardenError>;
}

/// A request seen by [`MockTransport`].
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Endpoint path.
    pub endpoint: String,
    /// Form parameters.
    pub params: Params,
    /// Access token.
    pub access_token: String,
}

#[cfg(any(test, feature = "test-seams"))]
impl RecordedRequest {
    /// Value of parameter `name`, if sent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Transport replaying queued responses, for tests.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<Vec<u8>, KeywardenError>>>,
    requests: std::sync::Mutex<Vec<RecordedRequest>>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockTransport {
    /// A transport with nothing queued; every request fails as unreachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response body.
    pub fn push_response(&self, body: impl Into<Vec<u8>>) {
        self.lock_responses().push_back(Ok(body.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: KeywardenError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Requests sent so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn lock_responses(
        &self,
    ) -> std::sync::MutexGuard<'_, std::collections::VecDeque<Result<Vec<u8>, KeywardenError>>> {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Transport for MockTransport {
    fn send_request(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
        access_token: &str,
    ) -> Result<Vec<u8>, KeywardenError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                endpoint: endpoint.to_string(),
                params: params.to_vec(),
                access_token: access_token.to_string(),
            });
        }

        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Err(KeywardenError::Transport("No response queued".to_string())))
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send_request(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
        access_token: &str,
    ) -> Result<Vec<u8>, KeywardenError> {
        (**self).send_request(endpoint, params, access_token)
    }
}
