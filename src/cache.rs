//! Environment-keyed credential cache with singleflight refreshes.
//!
//! [`CredentialCache::get_token`] serves a stored token while it is fresh and otherwise
//! resolves the environment's client credentials, performs one `client_credentials`
//! exchange, and stores the result under the treated expiry computed by the
//! [`TokenLifetimePolicy`]. A per-environment guard makes concurrent callers for the same
//! environment wait on a single in-flight refresh instead of stampeding the token endpoint,
//! while other environments proceed independently.

// self
use crate::{
	_prelude::*,
	auth::{AccessGrant, CachedToken, EnvironmentId},
	config::{ExchangeSettings, RelayConfig, TokenLifetimePolicy},
	error::{AuthenticationError, ConfigError},
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ExchangeFacade, ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, CacheEvent, FlowKind, FlowOutcome, FlowSpan},
	secrets::SecretStore,
	store::TokenStore,
};

/// Resolves bearer tokens per environment, exchanging client credentials only when needed.
#[derive(Clone)]
pub struct CredentialCache<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Token store holding the current token per environment.
	pub store: Arc<dyn TokenStore>,
	/// Secret store consulted on every refresh.
	pub secrets: Arc<dyn SecretStore>,
	/// Token endpoint settings shared by all environments.
	pub settings: ExchangeSettings,
	/// Policy deciding how long exchanged tokens are served.
	pub lifetime: TokenLifetimePolicy,
	/// HTTP client wrapper used for every exchange.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	guards: Arc<Mutex<HashMap<EnvironmentId, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> CredentialCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a cache that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		secrets: Arc<dyn SecretStore>,
		settings: ExchangeSettings,
		lifetime: TokenLifetimePolicy,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			store,
			secrets,
			settings,
			lifetime,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			guards: Default::default(),
		}
	}

	/// Returns a bearer token for `environment`, refreshing it if none is fresh.
	pub async fn get_token(&self, environment: &EnvironmentId) -> Result<AccessGrant> {
		self.get_token_at(environment, OffsetDateTime::now_utc()).await
	}

	/// Same as [`CredentialCache::get_token`] with freshness judged at `now`.
	///
	/// A stored token is served while `now < expires_at`. On a miss, exactly one exchange
	/// runs per environment at a time; callers that waited on it are served the token it
	/// stored. Failures leave the store untouched.
	pub async fn get_token_at(
		&self,
		environment: &EnvironmentId,
		now: OffsetDateTime,
	) -> Result<AccessGrant> {
		const KIND: FlowKind = FlowKind::TokenLookup;

		let span = FlowSpan::new(KIND, "get_token", environment.as_ref());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let guard = self.guard(environment);
		let result = span
			.instrument(async {
				let _singleflight = guard.lock().await;

				if let Some(current) = self
					.store
					.fetch(environment)
					.await
					.map_err(Error::from)?
					.filter(|token| token.is_fresh_at(now))
				{
					note_cache_event(CacheEvent::Hit, environment);

					return Ok(current.grant());
				}

				note_cache_event(CacheEvent::Miss, environment);

				self.refresh(environment, now).await
			})
			.await;

		self.release(environment, guard);

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn refresh(
		&self,
		environment: &EnvironmentId,
		now: OffsetDateTime,
	) -> Result<AccessGrant> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "refresh", environment.as_ref());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let credentials = self
					.secrets
					.fetch(environment)
					.await
					.map_err(ConfigError::from)?
					.ok_or_else(|| ConfigError::MissingCredentials {
						environment: environment.to_string(),
					})?;
				let facade = ExchangeFacade::from_credentials(
					&self.settings,
					&credentials,
					Arc::clone(&self.http_client),
					Arc::clone(&self.transport_mapper),
				)?;
				let exchange = facade.exchange_client_credentials().await?;
				let grant = AccessGrant {
					access_token: exchange.access_token.clone(),
					instance_url: exchange.instance_url.clone(),
				};
				let Some(ttl) = self.lifetime.treated_ttl(exchange.expires_in) else {
					note_cache_event(CacheEvent::Uncacheable, environment);

					return Ok(grant);
				};
				let token = CachedToken::builder(environment.clone())
					.access_token(exchange.access_token.expose())
					.instance_url(exchange.instance_url)
					.issued_at(now)
					.expires_in(ttl)
					.build()
					.map_err(AuthenticationError::from)?;

				self.store.save(token).await?;
				note_cache_event(CacheEvent::Stored, environment);

				Ok(grant)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn guard(&self, environment: &EnvironmentId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(environment.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	// Guards are cloned only under the map lock, so a count of two (map plus `guard`) means
	// nobody else is waiting and the entry can go.
	fn release(&self, environment: &EnvironmentId, guard: Arc<AsyncMutex<()>>) {
		let mut guards = self.guards.lock();

		if Arc::strong_count(&guard) == 2
			&& guards.get(environment).is_some_and(|current| Arc::ptr_eq(current, &guard))
		{
			guards.remove(environment);
		}
	}
}
impl CredentialCache<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a cache with its own reqwest transport built from `config`.
	pub fn new(
		store: Arc<dyn TokenStore>,
		secrets: Arc<dyn SecretStore>,
		config: &RelayConfig,
	) -> Result<Self> {
		config.validate().map_err(ConfigError::from)?;

		Ok(Self::with_http_client(
			store,
			secrets,
			config.exchange_settings(),
			config.lifetime_policy(),
			config.http_client()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> Debug for CredentialCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialCache")
			.field("settings", &self.settings)
			.field("lifetime", &self.lifetime)
			.field("environments_in_flight", &self.guards.lock().len())
			.finish()
	}
}

fn note_cache_event(event: CacheEvent, environment: &EnvironmentId) {
	obs::record_cache_event(event);
	obs::trace_cache_event(event, environment.as_ref());
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::test_config,
		secrets::MemorySecretStore,
		store::MemoryStore,
	};

	fn environment(name: &str) -> EnvironmentId {
		EnvironmentId::new(name).expect("Environment fixture should be valid.")
	}

	fn cache_with(store: Arc<MemoryStore>, secrets: Arc<MemorySecretStore>) -> CredentialCache {
		let config = test_config("https://login.example.com");

		CredentialCache::new(store, secrets, &config).expect("Cache should build from defaults.")
	}

	#[tokio::test]
	async fn fresh_token_is_served_without_lookups() {
		let store = Arc::new(MemoryStore::default());
		let secrets = Arc::new(MemorySecretStore::default());
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let token = CachedToken::builder(environment("qa"))
			.access_token("cached")
			.instance_url(Url::parse("https://qa.my.example.com").expect("URL should parse."))
			.issued_at(issued)
			.expires_in(Duration::seconds(5_400))
			.build()
			.expect("Token fixture should build.");

		store.save(token).await.expect("Seeding the store should succeed.");

		let cache = cache_with(store, secrets.clone());
		let grant = cache
			.get_token_at(&environment("qa"), issued + Duration::seconds(5_399))
			.await
			.expect("Fresh token should be served.");

		assert_eq!(grant.access_token.expose(), "cached");
		assert_eq!(secrets.lookup_count(), 0);
	}

	#[tokio::test]
	async fn missing_credentials_fail_without_touching_the_store() {
		let store = Arc::new(MemoryStore::default());
		let secrets = Arc::new(MemorySecretStore::default());
		let cache = cache_with(store.clone(), secrets.clone());
		let err = cache
			.get_token(&environment("unknown"))
			.await
			.expect_err("Unconfigured environment must fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingCredentials { .. })));
		assert_eq!(secrets.lookup_count(), 1);
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn unknown_environments_leave_no_guard_behind() {
		let secrets = Arc::new(MemorySecretStore::default());
		let cache = cache_with(Arc::new(MemoryStore::default()), secrets.clone());

		for i in 0..32 {
			let _ = cache.get_token(&environment(&format!("unknown-{i}"))).await;
		}

		assert_eq!(secrets.lookup_count(), 32);
		assert!(cache.guards.lock().is_empty());
	}

	#[test]
	fn guards_in_use_are_kept() {
		let cache = cache_with(
			Arc::new(MemoryStore::default()),
			Arc::new(MemorySecretStore::default()),
		);
		let qa = environment("qa");
		let waiting = cache.guard(&qa);
		let finished = cache.guard(&qa);

		cache.release(&qa, finished);

		assert_eq!(cache.guards.lock().len(), 1);

		cache.release(&qa, waiting);

		assert!(cache.guards.lock().is_empty());
	}

	#[test]
	fn guards_are_shared_per_environment() {
		let cache = cache_with(
			Arc::new(MemoryStore::default()),
			Arc::new(MemorySecretStore::default()),
		);
		let first = cache.guard(&environment("qa"));
		let second = cache.guard(&environment("qa"));
		let other = cache.guard(&environment("prod"));

		assert!(Arc::ptr_eq(&first, &second));
		assert!(!Arc::ptr_eq(&first, &other));
	}
}
