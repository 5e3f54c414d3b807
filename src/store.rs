//! Storage contract and built-in store implementation for cached environment tokens.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, EnvironmentId},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by token stores.
///
/// The contract is purely additive: records are replaced in place and never deleted, and
/// nothing evicts them in the background.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the token for the record's environment.
	fn save(&self, token: CachedToken) -> StoreFuture<'_, ()>;

	/// Fetches the token stored for `environment`, if any, regardless of freshness.
	fn fetch<'a>(&'a self, environment: &'a EnvironmentId)
	-> StoreFuture<'a, Option<CachedToken>>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
