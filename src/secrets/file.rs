//! JSON-file backed [`SecretStore`] for lightweight deployments.
//!
//! The file holds one object keyed by environment name:
//!
//! ```json
//! { "qa": { "client_id": "...", "client_secret": "...", "instance_url": "https://..." } }
//! ```

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, EnvironmentId},
	secrets::{SecretFuture, SecretStore, SecretStoreError},
};

type CredentialMap = HashMap<EnvironmentId, ClientCredentials>;

/// Loads credentials from a JSON file on open; [`FileSecretStore::reload`] re-reads it.
#[derive(Clone, Debug)]
pub struct FileSecretStore {
	path: PathBuf,
	inner: Arc<RwLock<CredentialMap>>,
}
impl FileSecretStore {
	/// Opens the store at `path`, eagerly loading its contents. A missing or empty file
	/// yields an empty store.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SecretStoreError> {
		let path = path.into();
		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Re-reads the backing file, replacing the in-memory snapshot only on success.
	pub fn reload(&self) -> Result<(), SecretStoreError> {
		let snapshot = Self::load_snapshot(&self.path)?;

		*self.inner.write() = snapshot;

		Ok(())
	}

	/// Environments currently configured.
	pub fn environments(&self) -> Vec<EnvironmentId> {
		let mut names: Vec<_> = self.inner.read().keys().cloned().collect();

		names.sort();

		names
	}

	fn load_snapshot(path: &Path) -> Result<CredentialMap, SecretStoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| SecretStoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(HashMap::new());
		}

		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(de).map_err(|e| SecretStoreError::Backend {
			message: format!("Failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
		})
	}
}
impl SecretStore for FileSecretStore {
	fn fetch<'a>(
		&'a self,
		environment: &'a EnvironmentId,
	) -> SecretFuture<'a, Option<ClientCredentials>> {
		Box::pin(async move { Ok(self.inner.read().get(environment).cloned()) })
	}
}
