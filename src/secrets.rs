//! Secret store contract and built-in backends that resolve client credentials per
//! environment.

pub mod env;
pub mod file;
pub mod memory;

pub use env::EnvSecretStore;
pub use file::FileSecretStore;
pub use memory::MemorySecretStore;

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, EnvironmentId},
};

/// Boxed future returned by [`SecretStore`] lookups.
pub type SecretFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, SecretStoreError>> + 'a + Send>>;

/// Credential source consulted whenever the cache needs a fresh token.
///
/// `Ok(None)` means the environment has no credentials configured; `Err` is reserved for
/// backend failures. Implementations that perform network I/O must bound their own calls.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Resolves the credentials for `environment`, if configured.
	fn fetch<'a>(
		&'a self,
		environment: &'a EnvironmentId,
	) -> SecretFuture<'a, Option<ClientCredentials>>;
}

/// Error type produced by [`SecretStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SecretStoreError {
	/// Stored credentials exist but are malformed.
	#[error("Invalid credentials for environment `{environment}`: {message}.")]
	Invalid {
		/// Environment whose credentials failed validation.
		environment: String,
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the secret source.
	#[error("Secret backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
