//! Thread-safe in-memory [`TokenStore`] implementation, the default per-process cache.

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, EnvironmentId},
	store::{StoreError, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<EnvironmentId, CachedToken>>>;

/// Thread-safe storage backend that keeps tokens in-process; starts empty on every boot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of environments holding a token, fresh or not.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no token has been stored yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: StoreMap, token: CachedToken) -> Result<(), StoreError> {
		map.write().insert(token.environment.clone(), token);

		Ok(())
	}

	fn fetch_now(map: StoreMap, environment: &EnvironmentId) -> Option<CachedToken> {
		map.read().get(environment).cloned()
	}
}
impl TokenStore for MemoryStore {
	fn save(&self, token: CachedToken) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, token) })
	}

	fn fetch<'a>(
		&'a self,
		environment: &'a EnvironmentId,
	) -> StoreFuture<'a, Option<CachedToken>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::fetch_now(map, environment)) })
	}
}
