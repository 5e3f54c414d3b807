//! Relay configuration: default environment, login endpoint, timeouts, lifetimes, and
//! inbound API keys.
//!
//! [`RelayConfig`] deserializes from JSON (every field optional, falling back to
//! [`RelayConfig::default`]) or is assembled through [`RelayConfigBuilder`]. Both paths run
//! the same validation so a constructed config is always usable.

pub mod lifetime;

pub use lifetime::*;

// std
use std::path::Path;
// crates.io
use reqwest::{header::HeaderName, redirect::Policy};
// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, TokenSecret},
	error::ConfigError,
	http::ReqwestHttpClient,
};

/// How client credentials are presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Errors raised while loading or validating a [`RelayConfig`].
#[derive(Debug, ThisError)]
pub enum RelayConfigError {
	/// Configuration file could not be read.
	#[error("Failed to read {path}: {message}.")]
	Read {
		/// File that failed to load.
		path: String,
		/// Underlying I/O failure.
		message: String,
	},
	/// Configuration JSON could not be parsed.
	#[error("Failed to parse relay configuration at `{}`.", .source.path())]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Environment header is not a valid HTTP header name.
	#[error("Environment header `{header}` is not a valid header name.")]
	InvalidEnvironmentHeader {
		/// Rejected header name.
		header: String,
	},
	/// Token path must be an absolute path on the login host.
	#[error("Token path `{path}` must start with `/`.")]
	InvalidTokenPath {
		/// Rejected path.
		path: String,
	},
	/// Network calls must be bounded.
	#[error("Request timeout must be positive.")]
	ZeroTimeout,
	/// Lifetime settings are inconsistent.
	#[error(transparent)]
	Lifetime(#[from] LifetimePolicyError),
}

/// Settings the token exchange needs, independent of any environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeSettings {
	/// Login base URL used when credentials do not carry their own.
	pub login_url: Url,
	/// Token endpoint path joined onto the login base URL.
	pub token_path: String,
	/// Client authentication method for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}

/// Complete relay configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
	/// Environment used when the caller selects none.
	pub default_environment: EnvironmentId,
	/// Inbound header carrying the environment selector.
	pub environment_header: String,
	/// Login base URL used when credentials do not carry their own.
	pub login_url: Url,
	/// Token endpoint path joined onto the login base URL.
	pub token_path: String,
	/// Client authentication method for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Deadline applied to every outbound call, in seconds.
	pub request_timeout_secs: u64,
	/// Assumed token validity when the exchange reports none, in seconds.
	pub token_validity_secs: u64,
	/// Period a token is served from the cache, in seconds.
	pub reuse_window_secs: u64,
	/// Inbound keys accepted for forwarding; empty disables inbound checks.
	pub api_keys: Vec<TokenSecret>,
	/// Inbound keys that are acknowledged but never forwarded.
	pub retired_api_keys: Vec<TokenSecret>,
}
impl RelayConfig {
	/// Default environment header name.
	pub const DEFAULT_ENVIRONMENT_HEADER: &'static str = "x-crm-environment";
	/// Default token endpoint path.
	pub const DEFAULT_TOKEN_PATH: &'static str = "/services/oauth2/token";
	/// Default login base URL.
	pub const DEFAULT_LOGIN_URL: &'static str = "https://login.salesforce.com";
	/// Default outbound deadline, in seconds.
	pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

	/// Creates a builder seeded with [`RelayConfig::default`].
	pub fn builder() -> RelayConfigBuilder {
		RelayConfigBuilder::default()
	}

	/// Parses and validates a JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self, RelayConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(de)
			.map_err(|source| RelayConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses, and validates a JSON file.
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RelayConfigError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path).map_err(|e| RelayConfigError::Read {
			path: path.display().to_string(),
			message: e.to_string(),
		})?;

		Self::from_json_str(&raw)
	}

	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), RelayConfigError> {
		if HeaderName::from_bytes(self.environment_header.as_bytes()).is_err() {
			return Err(RelayConfigError::InvalidEnvironmentHeader {
				header: self.environment_header.clone(),
			});
		}
		if !self.token_path.starts_with('/') {
			return Err(RelayConfigError::InvalidTokenPath { path: self.token_path.clone() });
		}
		if self.request_timeout_secs == 0 {
			return Err(RelayConfigError::ZeroTimeout);
		}

		self.try_lifetime_policy()?;

		Ok(())
	}

	/// Deadline applied to every outbound call.
	pub fn request_timeout(&self) -> Duration {
		Duration::seconds(i64::try_from(self.request_timeout_secs).unwrap_or(i64::MAX))
	}

	/// Exchange settings derived from this configuration.
	pub fn exchange_settings(&self) -> ExchangeSettings {
		ExchangeSettings {
			login_url: self.login_url.clone(),
			token_path: self.token_path.clone(),
			client_auth_method: self.client_auth_method,
		}
	}

	/// Lifetime policy derived from this configuration.
	///
	/// Falls back to [`TokenLifetimePolicy::default`] if the config was mutated into an
	/// invalid state after validation.
	pub fn lifetime_policy(&self) -> TokenLifetimePolicy {
		self.try_lifetime_policy().unwrap_or_default()
	}

	/// Builds the reqwest client used for both the exchange and forwarding: bounded by
	/// [`RelayConfig::request_timeout`] and never following redirects.
	pub fn http_client(&self) -> Result<ReqwestHttpClient, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(std::time::Duration::from_secs(self.request_timeout_secs))
			.redirect(Policy::none())
			.build()?;

		Ok(ReqwestHttpClient::with_client(client))
	}

	fn try_lifetime_policy(&self) -> Result<TokenLifetimePolicy, LifetimePolicyError> {
		TokenLifetimePolicy::new(
			Duration::seconds(i64::try_from(self.token_validity_secs).unwrap_or(i64::MAX)),
			Duration::seconds(i64::try_from(self.reuse_window_secs).unwrap_or(i64::MAX)),
		)
	}
}
impl Default for RelayConfig {
	fn default() -> Self {
		Self {
			default_environment: EnvironmentId::new("production")
				.expect("Built-in default environment should be valid."),
			environment_header: Self::DEFAULT_ENVIRONMENT_HEADER.into(),
			login_url: Url::parse(Self::DEFAULT_LOGIN_URL)
				.expect("Built-in default login URL should parse."),
			token_path: Self::DEFAULT_TOKEN_PATH.into(),
			client_auth_method: ClientAuthMethod::default(),
			request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
			token_validity_secs: TokenLifetimePolicy::DEFAULT_VALIDITY
				.whole_seconds()
				.unsigned_abs(),
			reuse_window_secs: TokenLifetimePolicy::DEFAULT_REUSE_WINDOW
				.whole_seconds()
				.unsigned_abs(),
			api_keys: Vec::new(),
			retired_api_keys: Vec::new(),
		}
	}
}

/// Builder for [`RelayConfig`] values.
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
	config: RelayConfig,
}
impl RelayConfigBuilder {
	/// Sets the environment used when the caller selects none.
	pub fn default_environment(mut self, environment: EnvironmentId) -> Self {
		self.config.default_environment = environment;

		self
	}

	/// Overrides the inbound environment header name.
	pub fn environment_header(mut self, header: impl Into<String>) -> Self {
		self.config.environment_header = header.into();

		self
	}

	/// Sets the login base URL.
	pub fn login_url(mut self, url: Url) -> Self {
		self.config.login_url = url;

		self
	}

	/// Overrides the token endpoint path.
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.config.token_path = path.into();

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.config.client_auth_method = method;

		self
	}

	/// Overrides the outbound deadline.
	pub fn request_timeout_secs(mut self, secs: u64) -> Self {
		self.config.request_timeout_secs = secs;

		self
	}

	/// Overrides the assumed validity and reuse windows.
	pub fn token_lifetime_secs(mut self, validity: u64, reuse_window: u64) -> Self {
		self.config.token_validity_secs = validity;
		self.config.reuse_window_secs = reuse_window;

		self
	}

	/// Adds an inbound key accepted for forwarding.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.config.api_keys.push(TokenSecret::new(key));

		self
	}

	/// Adds an inbound key that is acknowledged but never forwarded.
	pub fn retired_api_key(mut self, key: impl Into<String>) -> Self {
		self.config.retired_api_keys.push(TokenSecret::new(key));

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<RelayConfig, RelayConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}
