//! Relay-level error types shared across the cache, secret stores, and gateway.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Missing or invalid environment, credentials, or local configuration.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Authorization server exchange failed or timed out.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Downstream API call failed, timed out, or returned a non-2xx status.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),

	/// Inbound caller presented no key or an unknown key.
	#[error("Caller is not authorized: {reason}.")]
	Unauthorized {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Inbound request cannot be forwarded as given.
	#[error("Request cannot be forwarded: {reason}.")]
	InvalidRequest {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Anything unexpected.
	#[error("Internal error: {message}.")]
	Internal {
		/// Human-readable error payload.
		message: String,
	},
}
impl Error {
	/// Returns a stable label for the error kind, used in boundary responses and telemetry.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Config(_) => "configuration",
			Self::Authentication(_) => "authentication",
			Self::Upstream(_) => "upstream",
			Self::Unauthorized { .. } => "unauthorized",
			Self::InvalidRequest { .. } => "invalid_request",
			Self::Storage(_) | Self::Internal { .. } => "internal",
		}
	}

	/// Returns `true` when the caller may retry the same request later.
	///
	/// Only timeouts and network failures qualify; nothing is retried internally.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Authentication(e) => e.is_retryable(),
			Self::Upstream(e) => e.is_retryable(),
			_ => false,
		}
	}

	/// Builds an [`Error::Internal`] from any displayable value.
	pub fn internal(message: impl Display) -> Self {
		Self::Internal { message: message.to_string() }
	}
}

/// Configuration failures: unknown environments, missing secrets, or bad local settings.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No credentials are configured for the environment.
	#[error("No credentials are configured for environment `{environment}`.")]
	MissingCredentials {
		/// Environment that was requested.
		environment: String,
	},
	/// Secret store failed while resolving credentials.
	#[error(transparent)]
	SecretStore(#[from] crate::secrets::SecretStoreError),
	/// Environment selector is not a valid identifier.
	#[error("Environment selector is invalid.")]
	InvalidEnvironment(#[from] crate::auth::IdentifierError),
	/// Relay configuration failed validation.
	#[error("Relay configuration is invalid.")]
	InvalidRelayConfig(#[from] crate::config::RelayConfigError),
	/// Login or token endpoint URL cannot be built.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Returns `true` when the failure stems from the caller's selection rather than the
	/// relay's own setup.
	pub fn is_caller_facing(&self) -> bool {
		matches!(self, Self::MissingCredentials { .. } | Self::InvalidEnvironment(_))
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Authorization server exchange failures.
#[derive(Debug, ThisError)]
pub enum AuthenticationError {
	/// Authorization server answered with a non-success status or an OAuth error body.
	#[error("Authorization server rejected the exchange: {reason}.")]
	Rejected {
		/// Provider- or relay-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Authorization server responded with JSON that could not be parsed.
	#[error("Authorization server returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Neither the exchange nor the credentials named an instance endpoint.
	#[error("Authorization server did not return an instance URL.")]
	MissingInstanceUrl,
	/// Instance URL returned by the exchange cannot be parsed.
	#[error("Authorization server returned an invalid instance URL.")]
	InvalidInstanceUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Authorization server reported a zero or negative token lifetime.
	#[error("Authorization server reported a non-positive token lifetime.")]
	NonPositiveLifetime,
	/// Authorization server answered successfully but without a usable access token.
	#[error("Authorization server returned an empty access token.")]
	EmptyAccessToken,
	/// Exchanged token cannot be turned into a cache record.
	#[error("Authorization server issued a token that cannot be cached.")]
	UncacheableToken(#[from] crate::auth::CachedTokenBuilderError),
	/// Exchange exceeded the configured deadline.
	#[error("Timed out while calling the authorization server.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the authorization server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl AuthenticationError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns `true` for timeouts and network failures.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Timeout | Self::Network { .. })
	}
}

/// Downstream API call failures.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Downstream API answered with a non-2xx status.
	#[error("Downstream API returned status {status}.")]
	Status {
		/// Status code returned downstream.
		status: u16,
		/// Response headers kept for relaying.
		headers: BTreeMap<String, String>,
		/// Response body kept for relaying.
		body: Vec<u8>,
	},
	/// Downstream call exceeded the configured deadline.
	#[error("Timed out while calling the downstream API.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the downstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns `true` for timeouts and network failures.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Timeout | Self::Network { .. })
	}
}
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
