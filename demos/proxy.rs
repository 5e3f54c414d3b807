//! Demonstrates relaying a CRM query through the gateway: the first call exchanges client
//! credentials, the second reuses the cached token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use crm_relay::{
	auth::{ClientCredentials, EnvironmentId},
	config::RelayConfig,
	gateway::{Gateway, ProxyRequest},
	reqwest::Method,
	secrets::MemorySecretStore,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/services/oauth2/token");
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\
				 \"instance_url\":\"{}\"}}",
				server.base_url()
			));
		})
		.await;
	let query_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/services/data/v59.0/query")
				.header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"totalSize\":1,\"done\":true,\"records\":[{\"Name\":\"Acme\"}]}");
		})
		.await;
	let secrets = MemorySecretStore::default().with(
		EnvironmentId::new("qa")?,
		ClientCredentials::new("demo-client", "super-secret")
			.with_instance_url(Url::parse(&server.base_url())?),
	);
	let config = RelayConfig::builder().default_environment(EnvironmentId::new("qa")?).build()?;
	let gateway =
		Gateway::from_config(Arc::new(MemoryStore::default()), Arc::new(secrets), config)?;

	for _ in 0..2 {
		let request = ProxyRequest::new(Method::GET, "/services/data/v59.0/query")
			.with_query("q", "SELECT Name FROM Account");
		let response = gateway.handle(request).await;

		println!("{} {}", response.status, response.text());
	}

	token_mock.assert_async().await;
	query_mock.assert_calls_async(2).await;

	Ok(())
}
