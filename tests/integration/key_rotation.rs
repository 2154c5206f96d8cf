//! Refresh semantics: last-known-good retention and key rotation.

// crates.io
use axum::http::StatusCode;
use oidc_key_issuer::derive_key_id;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::*;

#[tokio::test]
async fn cached_material_survives_source_outage() {
	let server = MockServer::start().await;

	for mock in source_mocks(PRIMARY_PRIVATE_PEM, PRIMARY_PUBLIC_PEM, "primary-secret") {
		mock.up_to_n_times(1).mount(&server).await;
	}
	for mock in failing_mocks(503) {
		mock.mount(&server).await;
	}

	let (store, app) = app_for(&server);
	let kid = get(&app, "/get-kid").await.json()["kid"].clone();

	assert_eq!(kid, derive_key_id(PRIMARY_PUBLIC_PEM).as_str());

	let err = store.refresh().await.expect_err("sources are down");

	assert!(err.is_key_acquisition());

	let response = get(&app, "/get-kid").await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.json()["kid"], kid);
	assert_eq!(
		get(&app, "/generate-token?email=ada%40example.com").await.status,
		StatusCode::OK
	);

	let health = get(&app, "/health").await;

	assert_eq!(health.status, StatusCode::OK);
	assert_eq!(health.json()["errorCount"], 1);
	assert_eq!(health.json()["keyId"], kid);
}

#[tokio::test]
async fn refresh_rotates_every_published_view_together() {
	let server = MockServer::start().await;

	for mock in source_mocks(PRIMARY_PRIVATE_PEM, PRIMARY_PUBLIC_PEM, "primary-secret") {
		mock.up_to_n_times(1).mount(&server).await;
	}
	for mock in source_mocks(ROTATED_PRIVATE_PEM, ROTATED_PUBLIC_PEM, "rotated-secret") {
		mock.mount(&server).await;
	}

	let (store, app) = app_for(&server);
	let before = get(&app, "/get-kid").await.json()["kid"].clone();

	store.refresh().await.expect("refresh");

	let after = get(&app, "/get-kid").await.json()["kid"].clone();

	assert_ne!(before, after);
	assert_eq!(after, derive_key_id(ROTATED_PUBLIC_PEM).as_str());
	assert_eq!(get(&app, "/public-key").await.text(), ROTATED_PUBLIC_PEM);
	assert_eq!(get(&app, "/.well-known/jwks.json").await.json()["keys"][0]["kid"], after);
	assert_eq!(get(&app, "/signing-secret").await.json()["signingSecret"], "rotated-secret");

	let token = get(&app, "/generate-token?email=ada%40example.com").await.json()["token"]
		.as_str()
		.expect("token")
		.to_owned();
	let header = jsonwebtoken::decode_header(&token).expect("header");

	assert_eq!(header.kid.as_deref(), after.as_str());
}

#[tokio::test]
async fn health_turns_ready_after_cold_start_recovers() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(PRIVATE_KEY_PATH))
		.respond_with(ResponseTemplate::new(500))
		.up_to_n_times(1)
		.mount(&server)
		.await;

	for mock in source_mocks(PRIMARY_PRIVATE_PEM, PRIMARY_PUBLIC_PEM, "primary-secret") {
		mock.mount(&server).await;
	}

	let (store, app) = app_for(&server);

	store.spawn_initial_fetch().await.expect("initial fetch task");

	let health = get(&app, "/health").await;

	assert_eq!(health.status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(health.json()["errorCount"], 1);

	assert_eq!(get(&app, "/get-kid").await.status, StatusCode::OK);

	let health = get(&app, "/health").await;

	assert_eq!(health.status, StatusCode::OK);
	assert_eq!(health.json()["state"], "Ready");
	assert_eq!(health.json()["errorCount"], 0);
}
