//! Caller-facing relay: inbound key checks, environment selection, token lookup, and
//! authenticated forwarding, with every outcome converted into a [`ProxyResponse`].

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

// self
use crate::{
	_prelude::*,
	auth::EnvironmentId,
	cache::CredentialCache,
	config::RelayConfig,
	error::{ConfigError, UpstreamError},
	http::{DownstreamClient, ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	secrets::SecretStore,
	store::TokenStore,
};

/// Outcome of the inbound key check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundAccess {
	/// Caller may be forwarded.
	Granted,
	/// Caller presented a retired key; acknowledge without forwarding.
	Retired,
}

/// Relays caller requests to the environment's instance using cached credentials.
pub struct Gateway<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Credential cache shared with other gateways or direct callers.
	pub cache: Arc<CredentialCache<C, M>>,
	/// Transport used for downstream calls.
	pub downstream: Arc<dyn DownstreamClient>,
	config: RelayConfig,
}
impl<C, M> Gateway<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a gateway over an existing cache and downstream transport.
	pub fn new(
		cache: Arc<CredentialCache<C, M>>,
		downstream: Arc<dyn DownstreamClient>,
		config: RelayConfig,
	) -> Self {
		Self { cache, downstream, config }
	}

	/// Configuration the gateway was built with.
	pub fn config(&self) -> &RelayConfig {
		&self.config
	}

	/// Handles `request` end to end; failures become structured error responses.
	pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse {
		match self.forward(request).await {
			Ok(response) => response,
			Err(e) => ProxyResponse::from_error(e),
		}
	}

	/// Fallible core of [`Gateway::handle`].
	///
	/// Non-2xx downstream answers surface as [`UpstreamError::Status`] carrying the status,
	/// headers, and body unchanged.
	pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse> {
		const KIND: FlowKind = FlowKind::Forward;

		if self.authenticate(&request)? == InboundAccess::Retired {
			return Ok(ProxyResponse::ignored());
		}

		let environment = self.select_environment(&request)?;
		let span = FlowSpan::new(KIND, "forward", environment.as_ref());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let grant = self.cache.get_token(&environment).await?;
				let forward = request.into_forward(&self.config.environment_header)?;
				let response = self.downstream.forward(&grant, forward).await?;

				if !response.is_success() {
					return Err(UpstreamError::Status {
						status: response.status,
						headers: response.headers,
						body: response.body,
					}
					.into());
				}

				Ok(ProxyResponse::from(response))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Checks the caller's `Authorization: Bearer <key>` against the configured keys.
	///
	/// With no keys configured every caller is granted.
	pub fn authenticate(&self, request: &ProxyRequest) -> Result<InboundAccess> {
		if self.config.api_keys.is_empty() && self.config.retired_api_keys.is_empty() {
			return Ok(InboundAccess::Granted);
		}

		let Some(key) = request.bearer_key() else {
			return Err(Error::Unauthorized { reason: "missing bearer key".into() });
		};

		if self.config.api_keys.iter().any(|active| active.matches(key)) {
			return Ok(InboundAccess::Granted);
		}
		if self.config.retired_api_keys.iter().any(|retired| retired.matches(key)) {
			return Ok(InboundAccess::Retired);
		}

		Err(Error::Unauthorized { reason: "unknown bearer key".into() })
	}

	/// Picks the environment: explicit selector, else the environment header, else the
	/// configured default.
	pub fn select_environment(&self, request: &ProxyRequest) -> Result<EnvironmentId> {
		let selected = request
			.environment
			.as_deref()
			.or_else(|| request.header(&self.config.environment_header));

		match selected {
			Some(raw) => Ok(EnvironmentId::new(raw.trim()).map_err(ConfigError::from)?),
			None => Ok(self.config.default_environment.clone()),
		}
	}
}
impl Gateway<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds a gateway whose cache and downstream calls share one reqwest client configured
	/// from `config`.
	pub fn from_config(
		store: Arc<dyn TokenStore>,
		secrets: Arc<dyn SecretStore>,
		config: RelayConfig,
	) -> Result<Self> {
		let cache = CredentialCache::new(store, secrets, &config)?;
		let downstream: Arc<dyn DownstreamClient> = cache.http_client.clone();

		Ok(Self::new(Arc::new(cache), downstream, config))
	}
}
impl<C, M> Debug for Gateway<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("cache", &self.cache)
			.field("default_environment", &self.config.default_environment)
			.field("environment_header", &self.config.environment_header)
			.field("inbound_keys", &self.config.api_keys.len())
			.finish()
	}
}
