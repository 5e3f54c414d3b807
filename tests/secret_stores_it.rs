// std
use std::{fs, path::PathBuf};
// crates.io
use httpmock::prelude::*;
// self
use crm_relay::{
	_preludet::*,
	auth::EnvironmentId,
	cache::CredentialCache,
	error::ConfigError,
	oauth::ReqwestTransportErrorMapper,
	secrets::{EnvSecretStore, FileSecretStore, SecretStore},
	store::{MemoryStore, TokenStore},
};

const TOKEN_PATH: &str = "/services/oauth2/token";

fn environment(name: &str) -> EnvironmentId {
	EnvironmentId::new(name).expect("Environment identifier should be valid for secret tests.")
}

fn temp_secrets_path(name: &str) -> PathBuf {
	std::env::temp_dir().join(format!("crm-relay-{name}-{}.json", std::process::id()))
}

fn cache_over(secrets: Arc<dyn SecretStore>, login_url: &str) -> ReqwestTestCache {
	let config = test_config(login_url);
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());

	CredentialCache::with_http_client(
		store,
		secrets,
		config.exchange_settings(),
		config.lifetime_policy(),
		test_reqwest_http_client(),
		Arc::new(ReqwestTransportErrorMapper),
	)
}

#[tokio::test]
async fn file_store_credentials_drive_the_exchange() {
	let server = MockServer::start_async().await;
	let path = temp_secrets_path("file-store");

	fs::write(
		&path,
		format!(
			"{{\"qa\":{{\"client_id\":\"qa-client\",\"client_secret\":\"qa-secret\",\
			 \"instance_url\":\"{}\"}}}}",
			server.base_url()
		),
	)
	.expect("Secrets fixture should be writable.");

	let secrets = FileSecretStore::open(&path).expect("Secrets fixture should load.");
	let cache = cache_over(Arc::new(secrets), "https://login.invalid.example.com");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"file-token\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let grant = cache.get_token(&environment("qa")).await.expect("Lookup should succeed.");
	let missing = cache
		.get_token(&environment("prod"))
		.await
		.expect_err("Environments absent from the file must fail.");

	assert_eq!(grant.access_token.expose(), "file-token");
	assert!(matches!(missing, Error::Config(ConfigError::MissingCredentials { .. })));

	mock.assert_async().await;

	let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn env_store_credentials_drive_the_exchange() {
	let server = MockServer::start_async().await;
	let secrets = EnvSecretStore::from_vars(
		"CRM",
		[
			("CRM_QA_CLIENT_ID", "qa-client".to_owned()),
			("CRM_QA_CLIENT_SECRET", "qa-secret".to_owned()),
			("CRM_QA_INSTANCE_URL", server.base_url()),
			("CRM_UAT_CLIENT_ID", "uat-client".to_owned()),
		],
	);
	let cache = cache_over(Arc::new(secrets), "https://login.invalid.example.com");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"env-token\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let grant = cache.get_token(&environment("qa")).await.expect("Lookup should succeed.");
	let partial = cache
		.get_token(&environment("uat"))
		.await
		.expect_err("Partially configured environments must fail.");

	assert_eq!(grant.access_token.expose(), "env-token");
	assert_eq!(grant.instance_url.as_str(), server.url("/"));
	assert!(matches!(partial, Error::Config(ConfigError::MissingCredentials { .. })));

	mock.assert_async().await;
}
