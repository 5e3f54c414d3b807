//! Caller-facing response model and the error-to-status boundary mapping.

// std
use std::borrow::Cow;
// self
use crate::{
	_prelude::*,
	error::{AuthenticationError, UpstreamError},
	gateway::request::is_hop_by_hop,
	http::ForwardResponse,
	obs,
};

/// Response returned to the relay's caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyResponse {
	/// Status code for the caller.
	pub status: u16,
	/// Response headers, lower-cased.
	pub headers: BTreeMap<String, String>,
	/// Response body bytes; JSON bodies are re-serialized, anything else is relayed as is.
	pub body: Vec<u8>,
}
impl ProxyResponse {
	/// Builds a JSON response with the given status.
	pub fn json(status: u16, value: &serde_json::Value) -> Self {
		let mut headers = BTreeMap::new();

		headers.insert("content-type".into(), "application/json".into());

		Self { status, headers, body: value.to_string().into_bytes() }
	}

	/// Acknowledgement returned to callers presenting a retired key.
	pub fn ignored() -> Self {
		Self::json(200, &serde_json::json!({ "ignored": true }))
	}

	/// Relays a downstream answer: status mirrored, body re-serialized, headers filtered.
	pub fn relay(status: u16, headers: BTreeMap<String, String>, body: Vec<u8>) -> Self {
		let headers = headers
			.into_iter()
			.filter(|(name, _)| {
				!is_hop_by_hop(name) && !name.eq_ignore_ascii_case("content-length")
			})
			.collect();

		Self { status, headers, body: reserialize_body(body) }
	}

	/// Converts any relay error into its boundary response.
	pub fn from_error(error: Error) -> Self {
		let status = status_for(&error);

		obs::trace_boundary_error(&error, status);

		match error {
			Error::Upstream(UpstreamError::Status { status, headers, body }) =>
				Self::relay(status, headers, body),
			error => Self::json(
				status,
				&serde_json::json!({ "error": error.kind(), "message": error.to_string() }),
			),
		}
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, with invalid sequences replaced.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}
impl From<ForwardResponse> for ProxyResponse {
	fn from(response: ForwardResponse) -> Self {
		Self::relay(response.status, response.headers, response.body)
	}
}

/// Status code the boundary uses for `error`.
pub fn status_for(error: &Error) -> u16 {
	match error {
		Error::Config(e) if e.is_caller_facing() => 400,
		Error::Config(_) | Error::Storage(_) | Error::Internal { .. } => 500,
		Error::Authentication(AuthenticationError::Timeout) => 504,
		Error::Authentication(_) => 502,
		Error::Upstream(UpstreamError::Status { status, .. }) => *status,
		Error::Upstream(UpstreamError::Timeout) => 504,
		Error::Upstream(UpstreamError::Network { .. }) => 502,
		Error::Unauthorized { .. } => 401,
		Error::InvalidRequest { .. } => 400,
	}
}

fn reserialize_body(body: Vec<u8>) -> Vec<u8> {
	match serde_json::from_slice::<serde_json::Value>(&body)
		.and_then(|value| serde_json::to_vec(&value))
	{
		Ok(compact) => compact,
		Err(_) => body,
	}
}
