//! Environment-variable backed [`SecretStore`].
//!
//! Credentials for environment `qa` under the default prefix are read from
//! `CRM_QA_CLIENT_ID`, `CRM_QA_CLIENT_SECRET`, and optionally `CRM_QA_INSTANCE_URL`.
//! Environment names are upper-cased and `-` becomes `_`. Only names made of lowercase ASCII
//! letters, digits, and `-` are served, so no two environments share a variable set.

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, EnvironmentId},
	secrets::{SecretFuture, SecretStore, SecretStoreError},
};

#[derive(Clone, Debug)]
enum VarSource {
	Process,
	Snapshot(HashMap<String, String>),
}

/// Reads credentials from process environment variables (or a captured snapshot).
#[derive(Clone, Debug)]
pub struct EnvSecretStore {
	prefix: String,
	source: VarSource,
}
impl EnvSecretStore {
	/// Default variable prefix.
	pub const DEFAULT_PREFIX: &'static str = "CRM";

	/// Reads from the live process environment under `prefix`.
	pub fn new(prefix: impl Into<String>) -> Self {
		Self { prefix: prefix.into(), source: VarSource::Process }
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			prefix: prefix.into(),
			source: VarSource::Snapshot(
				vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
			),
		}
	}

	/// Returns `true` if `environment` maps onto its own variable set.
	pub fn supports(environment: &EnvironmentId) -> bool {
		environment.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
	}

	/// Variable name holding `field` for `environment`.
	pub fn var_name(&self, environment: &EnvironmentId, field: &str) -> String {
		let env: String = environment
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
			.collect();

		format!("{}_{env}_{field}", self.prefix)
	}

	fn read(&self, name: &str) -> Option<String> {
		let value = match &self.source {
			VarSource::Process => std::env::var(name).ok(),
			VarSource::Snapshot(vars) => vars.get(name).cloned(),
		};

		value.filter(|v| !v.trim().is_empty())
	}

	fn resolve(
		&self,
		environment: &EnvironmentId,
	) -> Result<Option<ClientCredentials>, SecretStoreError> {
		if !Self::supports(environment) {
			return Err(SecretStoreError::Invalid {
				environment: environment.to_string(),
				message: "only lowercase letters, digits, and `-` map onto variable names".into(),
			});
		}

		let (Some(client_id), Some(client_secret)) = (
			self.read(&self.var_name(environment, "CLIENT_ID")),
			self.read(&self.var_name(environment, "CLIENT_SECRET")),
		) else {
			return Ok(None);
		};
		let mut credentials = ClientCredentials::new(client_id, client_secret);

		if let Some(raw) = self.read(&self.var_name(environment, "INSTANCE_URL")) {
			let url = Url::parse(raw.trim()).map_err(|e| SecretStoreError::Invalid {
				environment: environment.to_string(),
				message: format!("instance URL is invalid: {e}"),
			})?;

			credentials = credentials.with_instance_url(url);
		}

		Ok(Some(credentials))
	}
}
impl Default for EnvSecretStore {
	fn default() -> Self {
		Self::new(Self::DEFAULT_PREFIX)
	}
}
impl SecretStore for EnvSecretStore {
	fn fetch<'a>(
		&'a self,
		environment: &'a EnvironmentId,
	) -> SecretFuture<'a, Option<ClientCredentials>> {
		Box::pin(async move { self.resolve(environment) })
	}
}
