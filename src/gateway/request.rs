//! Caller-facing request model and inbound header filtering.

// crates.io
use reqwest::Method;
// self
use crate::{_prelude::*, http::ForwardRequest};

/// Headers describing a single hop; never relayed in either direction.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
	"connection",
	"keep-alive",
	"proxy-authenticate",
	"proxy-authorization",
	"te",
	"trailer",
	"transfer-encoding",
	"upgrade",
];

/// Inbound request as received by the relay.
#[derive(Clone, Debug)]
pub struct ProxyRequest {
	/// HTTP method to replay downstream.
	pub method: Method,
	/// Path relative to the instance, starting with `/`.
	pub path: String,
	/// Query parameters in arrival order.
	pub query: Vec<(String, String)>,
	/// Inbound headers in arrival order.
	pub headers: Vec<(String, String)>,
	/// Raw request body, if any.
	pub body: Option<Vec<u8>>,
	/// Explicit environment selector; wins over the environment header.
	pub environment: Option<String>,
}
impl ProxyRequest {
	/// Creates a bodiless request for `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: Vec::new(),
			body: None,
			environment: None,
		}
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Sets the explicit environment selector.
	pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());

		self
	}

	/// Returns the first value of header `name`, compared case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the key presented as `Authorization: Bearer <key>`, if any.
	pub fn bearer_key(&self) -> Option<&str> {
		let value = self.header("authorization")?.trim();
		let (scheme, key) = value.split_once(' ')?;

		if !scheme.eq_ignore_ascii_case("bearer") {
			return None;
		}

		let key = key.trim();

		(!key.is_empty()).then_some(key)
	}

	/// Converts into the downstream request, dropping headers that must not be relayed.
	///
	/// `Accept-Encoding` is dropped as well so downstream bodies arrive uncompressed.
	pub(crate) fn into_forward(self, environment_header: &str) -> Result<ForwardRequest> {
		if !self.path.starts_with('/') || self.path.starts_with("//") {
			return Err(Error::InvalidRequest {
				reason: format!("path `{}` must be relative to the instance", self.path),
			});
		}

		let headers = self
			.headers
			.into_iter()
			.filter(|(name, _)| is_forwardable(name, environment_header))
			.collect();

		Ok(ForwardRequest {
			method: self.method,
			path: self.path,
			query: self.query,
			headers,
			body: self.body,
		})
	}
}

/// Returns `true` if `name` is a hop-by-hop header.
pub fn is_hop_by_hop(name: &str) -> bool {
	HOP_BY_HOP_HEADERS.iter().any(|hop| hop.eq_ignore_ascii_case(name))
}

fn is_forwardable(name: &str, environment_header: &str) -> bool {
	!is_hop_by_hop(name)
		&& !["host", "authorization", "content-length", "accept-encoding"]
			.iter()
			.any(|dropped| dropped.eq_ignore_ascii_case(name))
		&& !name.eq_ignore_ascii_case(environment_header)
}
