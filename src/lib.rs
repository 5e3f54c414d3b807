//! Environment-keyed CRM credential cache and authenticated request relay.
//!
//! Client credentials are exchanged once per environment and the bearer token is reused
//! until its treated expiry. Caller requests are forwarded to the issuing instance, and
//! failures surface as typed boundary errors.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod secrets;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		cache::CredentialCache,
		config::RelayConfig,
		gateway::Gateway,
		http::{DownstreamClient, ReqwestHttpClient},
		oauth::ReqwestTransportErrorMapper,
		secrets::{MemorySecretStore, SecretStore},
		store::{MemoryStore, TokenStore},
	};

	/// Cache type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCache = CredentialCache<ReqwestHttpClient, ReqwestTransportErrorMapper>;
	/// Gateway type alias used by reqwest-backed integration tests.
	pub type ReqwestTestGateway = Gateway<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(std::time::Duration::from_secs(5))
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Returns a relay configuration whose login URL points at the provided mock server base.
	pub fn test_config(login_url: &str) -> RelayConfig {
		RelayConfig::builder()
			.login_url(Url::parse(login_url).expect("Mock login URL should parse successfully."))
			.build()
			.expect("Test relay configuration should build successfully.")
	}

	/// Constructs a [`CredentialCache`] backed by an in-memory token store, the provided
	/// secrets, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_cache(
		config: &RelayConfig,
		secrets: Arc<MemorySecretStore>,
	) -> (ReqwestTestCache, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let secrets: Arc<dyn SecretStore> = secrets;
		let cache = CredentialCache::with_http_client(
			store,
			secrets,
			config.exchange_settings(),
			config.lifetime_policy(),
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		);

		(cache, store_backend)
	}

	/// Constructs a [`Gateway`] on top of [`build_reqwest_test_cache`] that forwards with the
	/// same insecure test client.
	pub fn build_reqwest_test_gateway(
		config: RelayConfig,
		secrets: Arc<MemorySecretStore>,
	) -> (ReqwestTestGateway, Arc<MemoryStore>) {
		let (cache, store) = build_reqwest_test_cache(&config, secrets);
		let downstream: Arc<dyn DownstreamClient> = Arc::new(test_reqwest_http_client());
		let gateway = Gateway::new(Arc::new(cache), downstream, config);

		(gateway, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, crm_relay as _, httpmock as _};
