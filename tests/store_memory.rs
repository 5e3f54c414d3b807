// crates.io
use time::macros;
// self
use crm_relay::{
	_preludet::*,
	auth::{CachedToken, EnvironmentId, TokenStatus},
	store::{MemoryStore, TokenStore},
};

fn environment(name: &str) -> EnvironmentId {
	EnvironmentId::new(name).expect("Failed to build environment identifier for store tests.")
}

fn build_token(environment_name: &str, access: &str, lifetime: Duration) -> CachedToken {
	let issued = macros::datetime!(2025-11-10 12:00 UTC);

	CachedToken::builder(environment(environment_name))
		.access_token(access)
		.instance_url(
			Url::parse("https://acme.my.example.com").expect("Instance fixture should parse."),
		)
		.issued_at(issued)
		.expires_in(lifetime)
		.build()
		.expect("Cached token fixture should build successfully.")
}

#[tokio::test]
async fn save_and_fetch_round_trip() {
	let store = MemoryStore::default();
	let token = build_token("qa", "access-1", Duration::hours(1));

	store.save(token.clone()).await.expect("Saving token fixture should succeed.");

	let fetched = store
		.fetch(&environment("qa"))
		.await
		.expect("Fetching token from memory store should succeed.")
		.expect("Stored token should remain present.");

	assert_eq!(fetched.access_token.expose(), token.access_token.expose());
	assert_eq!(fetched.expires_at, token.expires_at);
	assert!(
		store
			.fetch(&environment("prod"))
			.await
			.expect("Fetching an unknown environment should succeed.")
			.is_none()
	);
}

#[tokio::test]
async fn save_replaces_in_place() {
	let store = MemoryStore::default();

	store
		.save(build_token("qa", "access-old", Duration::hours(1)))
		.await
		.expect("Saving the initial token should succeed.");
	store
		.save(build_token("qa", "access-new", Duration::hours(1)))
		.await
		.expect("Saving the replacement token should succeed.");

	let fetched = store
		.fetch(&environment("qa"))
		.await
		.expect("Fetching replaced token should succeed.")
		.expect("Replaced token should remain present.");

	assert_eq!(fetched.access_token.expose(), "access-new");
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn expired_tokens_stay_until_replaced() {
	let store = MemoryStore::default();
	let token = build_token("qa", "access", Duration::minutes(5));
	let later = token.expires_at + Duration::hours(1);

	store.save(token).await.expect("Saving short-lived token should succeed.");

	let fetched = store
		.fetch(&environment("qa"))
		.await
		.expect("Fetching expired token should succeed.")
		.expect("Expired token should remain present for inspection.");

	assert_eq!(fetched.status_at(later), TokenStatus::Expired);
}

#[tokio::test]
async fn concurrent_saves_keep_one_token_per_environment() {
	let store = MemoryStore::default();
	let tasks = ["qa", "qa", "uat", "prod"].into_iter().enumerate().map(|(idx, name)| {
		let store = store.clone();

		tokio::spawn(async move {
			store
				.save(build_token(name, &format!("access-{idx}"), Duration::hours(1)))
				.await
				.expect("Concurrent save should succeed.")
		})
	});

	for task in tasks.collect::<Vec<_>>() {
		task.await.expect("Save task should not panic.");
	}

	assert_eq!(store.len(), 3);
}
