//! Client credentials resolved from a secret store for one environment.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Confidential client credentials used for the `client_credentials` exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret; callers must avoid logging it.
	pub client_secret: TokenSecret,
	/// Login base URL for the environment; also the fallback instance endpoint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub instance_url: Option<Url>,
}
impl ClientCredentials {
	/// Creates credentials without an instance URL.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			instance_url: None,
		}
	}

	/// Sets or replaces the instance URL.
	pub fn with_instance_url(mut self, url: Url) -> Self {
		self.instance_url = Some(url);

		self
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("instance_url", &self.instance_url.as_ref().map(Url::as_str))
			.finish()
	}
}
