//! Endpoint behaviour against healthy and failing key sources.

// crates.io
use axum::{
	body::Body,
	http::{Request, StatusCode, header},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, jwk::JwkSet};
use oidc_key_issuer::{TokenClaims, derive_key_id, token::DEFAULT_AUDIENCE};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::*;

async fn healthy_server() -> MockServer {
	let server = MockServer::start().await;

	for mock in source_mocks(PRIMARY_PRIVATE_PEM, PRIMARY_PUBLIC_PEM, "primary-secret") {
		mock.mount(&server).await;
	}

	server
}

#[tokio::test]
async fn kid_is_consistent_across_endpoints() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = healthy_server().await;
	let (_, app) = app_for(&server);
	let kid = get(&app, "/get-kid").await;

	assert_eq!(kid.status, StatusCode::OK);

	let kid = kid.json()["kid"].as_str().expect("kid").to_owned();

	assert_eq!(kid, derive_key_id(PRIMARY_PUBLIC_PEM));

	let public_key = get(&app, "/public-key").await;

	assert_eq!(public_key.status, StatusCode::OK);
	assert!(
		public_key.headers[header::CONTENT_TYPE]
			.to_str()
			.expect("content type")
			.starts_with("text/plain")
	);
	assert_eq!(public_key.text(), PRIMARY_PUBLIC_PEM);
	assert_eq!(derive_key_id(&public_key.text()), kid);

	let jwks = get(&app, "/.well-known/jwks.json").await;

	assert_eq!(jwks.status, StatusCode::OK);

	let jwks = jwks.json();

	assert_eq!(jwks["keys"].as_array().map(Vec::len), Some(1));
	assert_eq!(jwks["keys"][0]["kid"], kid.as_str());
	assert_eq!(jwks["keys"][0]["kty"], "RSA");
	assert_eq!(jwks["keys"][0]["alg"], "RS256");
	assert_eq!(jwks["keys"][0]["use"], "sig");
	assert_eq!(jwks["keys"][0]["e"], "AQAB");
}

#[tokio::test]
async fn key_material_is_fetched_once_for_many_requests() {
	let server = MockServer::start().await;

	for mock in source_mocks(PRIMARY_PRIVATE_PEM, PRIMARY_PUBLIC_PEM, "primary-secret") {
		mock.expect(1).mount(&server).await;
	}

	let (_, app) = app_for(&server);

	for uri in ["/get-kid", "/signing-secret", "/public-key", "/.well-known/jwks.json"] {
		assert_eq!(get(&app, uri).await.status, StatusCode::OK, "{uri}");
	}

	server.verify().await;
}

#[tokio::test]
async fn signing_secret_is_served_verbatim() {
	let server = healthy_server().await;
	let (_, app) = app_for(&server);
	let response = get(&app, "/signing-secret").await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.json(), serde_json::json!({ "signingSecret": "primary-secret" }));
}

#[tokio::test]
async fn generated_token_verifies_with_published_keys() {
	let server = healthy_server().await;
	let (_, app) = app_for(&server);
	let response = get(&app, "/generate-token?email=ada%40example.com").await;

	assert_eq!(response.status, StatusCode::OK);

	let token = response.json()["token"].as_str().expect("token").to_owned();
	let header = jsonwebtoken::decode_header(&token).expect("header");
	let kid = get(&app, "/get-kid").await.json()["kid"].as_str().expect("kid").to_owned();

	assert_eq!(header.alg, Algorithm::RS256);
	assert_eq!(header.kid.as_deref(), Some(kid.as_str()));

	let mut validation = Validation::new(Algorithm::RS256);

	validation.set_audience(&[DEFAULT_AUDIENCE]);

	let pem = get(&app, "/public-key").await.text();
	let key = DecodingKey::from_rsa_pem(pem.as_bytes()).expect("pem key");
	let claims = jsonwebtoken::decode::<TokenClaims>(&token, &key, &validation)
		.expect("verifies with served PEM")
		.claims;

	assert_eq!(claims.sub, "ada@example.com");
	assert_eq!(claims.exp - claims.iat, 3600);

	let set: JwkSet = serde_json::from_slice(&get(&app, "/.well-known/jwks.json").await.body)
		.expect("jwk set");
	let jwk = set.find(&kid).expect("jwk by kid");
	let key = DecodingKey::from_jwk(jwk).expect("jwk key");

	jsonwebtoken::decode::<TokenClaims>(&token, &key, &validation).expect("verifies with JWKS");
}

#[tokio::test]
async fn missing_email_is_rejected_without_fetching() {
	let server = MockServer::start().await;

	for mock in source_mocks(PRIMARY_PRIVATE_PEM, PRIMARY_PUBLIC_PEM, "primary-secret") {
		mock.expect(0).mount(&server).await;
	}

	let (_, app) = app_for(&server);

	for uri in ["/generate-token", "/generate-token?email=", "/generate-token?email=%20"] {
		let response = get(&app, uri).await;

		assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
		assert_eq!(response.json(), serde_json::json!({ "error": "Email is required" }));
	}

	server.verify().await;
}

#[tokio::test]
async fn discovery_reflects_request_host() {
	let server = MockServer::start().await;
	let (_, app) = app_for(&server);
	let request = Request::get("/.well-known/openid-configuration")
		.header(header::HOST, "issuer.example.com")
		.body(Body::empty())
		.expect("request");
	let response = send(&app, request).await;

	assert_eq!(response.status, StatusCode::OK);

	let document = response.json();

	assert_eq!(document["issuer"], "https://issuer.example.com");
	assert_eq!(document["jwks_uri"], "https://issuer.example.com/.well-known/jwks.json");
	assert_eq!(document["id_token_signing_alg_values_supported"], serde_json::json!(["RS256"]));

	let response = get(&app, "/.well-known/openid-configuration").await;

	assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remote_failure_surfaces_as_internal_error() {
	let server = MockServer::start().await;

	for mock in failing_mocks(500) {
		mock.mount(&server).await;
	}

	let (_, app) = app_for(&server);
	let cases = [
		("/get-kid", "Failed to fetch kid"),
		("/signing-secret", "Failed to fetch signing secret"),
		("/generate-token?email=ada%40example.com", "Failed to generate token"),
		("/public-key", "Failed to fetch public key"),
		("/.well-known/jwks.json", "Failed to fetch JWKS"),
	];

	for (uri, message) in cases {
		let response = get(&app, uri).await;

		assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
		assert_eq!(response.json(), serde_json::json!({ "error": message }));
	}

	let health = get(&app, "/health").await;

	assert_eq!(health.status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(health.json()["state"], "Empty");
	assert_eq!(health.json()["ready"], false);
}

#[tokio::test]
async fn malformed_secret_fails_the_whole_fetch() {
	let server = MockServer::start().await;
	let mut mocks = source_mocks(PRIMARY_PRIVATE_PEM, PRIMARY_PUBLIC_PEM, "unused");

	// Swap the secret mock for one lacking the `secret` member.
	mocks.pop();
	mocks.push(
		Mock::given(method("GET"))
			.and(path(SIGNING_SECRET_PATH))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(serde_json::json!({ "key": "x" })),
			),
	);

	for mock in mocks {
		mock.mount(&server).await;
	}

	let (store, app) = app_for(&server);

	assert_eq!(get(&app, "/get-kid").await.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(store.get().await.is_none());
}

#[tokio::test]
async fn responses_allow_cross_origin_requests() {
	let server = healthy_server().await;
	let (_, app) = app_for(&server);
	let request = Request::get("/get-kid")
		.header(header::ORIGIN, "https://widgets.example.com")
		.body(Body::empty())
		.expect("request");
	let response = send(&app, request).await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
