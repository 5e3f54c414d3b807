//! In-memory [`SecretStore`] for local development, demos, and tests.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, EnvironmentId},
	secrets::{SecretFuture, SecretStore},
};

/// Thread-safe credential map that also counts lookups.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
	entries: RwLock<HashMap<EnvironmentId, ClientCredentials>>,
	lookups: AtomicUsize,
}
impl MemorySecretStore {
	/// Registers (or replaces) credentials for an environment.
	pub fn insert(&self, environment: EnvironmentId, credentials: ClientCredentials) {
		self.entries.write().insert(environment, credentials);
	}

	/// Builder-style variant of [`MemorySecretStore::insert`].
	pub fn with(self, environment: EnvironmentId, credentials: ClientCredentials) -> Self {
		self.insert(environment, credentials);

		self
	}

	/// Number of lookups served since construction, hits and misses alike.
	pub fn lookup_count(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}
}
impl SecretStore for MemorySecretStore {
	fn fetch<'a>(
		&'a self,
		environment: &'a EnvironmentId,
	) -> SecretFuture<'a, Option<ClientCredentials>> {
		Box::pin(async move {
			self.lookups.fetch_add(1, Ordering::SeqCst);

			Ok(self.entries.read().get(environment).cloned())
		})
	}
}
