//! HTTP surface: routes, handlers, and error mapping.

// crates.io
use axum::{
	Json, Router,
	extract::{Query, State},
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::get,
};
use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
// self
use crate::{
	_prelude::*,
	cache::{KeyStore, StoreStatus},
	config::Config,
	discovery::{DiscoveryDocument, JWKS_PATH, OPENID_CONFIGURATION_PATH},
	jwks,
	token::{TokenIssuer, TokenSettings},
};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Key material store.
	pub store: KeyStore,
	/// Token issuer bound to the same store.
	pub issuer: TokenIssuer,
}
impl AppState {
	/// Bind a token issuer to `store`.
	pub fn new(store: KeyStore, settings: TokenSettings) -> Self {
		let issuer = TokenIssuer::new(store.clone(), settings);

		Self { store, issuer }
	}
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
	let router = Router::new()
		.route("/get-kid", get(get_kid))
		.route("/signing-secret", get(signing_secret))
		.route("/generate-token", get(generate_token))
		.route("/public-key", get(public_key))
		.route(OPENID_CONFIGURATION_PATH, get(openid_configuration))
		.route(JWKS_PATH, get(jwks_document))
		.route("/health", get(health));
	#[cfg(feature = "prometheus")]
	let router = router.route("/metrics", get(prometheus_metrics));

	router.layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http()).with_state(state)
}

/// Build the store, start the background fetch, and serve until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
	let store = KeyStore::from_sources(config.sources.clone())?;
	let _ = store.spawn_initial_fetch();
	let app = router(AppState::new(store, config.token.clone()));
	let listener = TcpListener::bind(config.bind_address).await?;

	tracing::info!(address = %config.bind_address, "token issuer listening");

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

/// JSON error body returned by every failing handler.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human-readable message; internal details are only logged.
	pub error: String,
}

/// Result returned by request handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Handler error carrying the response status and public message.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	message: String,
}
impl ApiError {
	/// Caller-input error.
	pub fn bad_request(message: impl Into<String>) -> Self {
		Self { status: StatusCode::BAD_REQUEST, message: message.into() }
	}

	/// Map a crate error to a response, hiding internal details behind `context`.
	pub fn from_error(err: Error, context: &'static str) -> Self {
		if err.is_invalid_request() {
			return Self::bad_request(err.to_string());
		}

		tracing::error!(error = %err, "{context}");

		Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: context.into() }
	}

	fn with_context(context: &'static str) -> impl FnOnce(Error) -> Self {
		move |err| Self::from_error(err, context)
	}

	/// Response status.
	pub fn status(&self) -> StatusCode {
		self.status
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(ErrorBody { error: self.message })).into_response()
	}
}

#[derive(Serialize)]
struct KidResponse {
	kid: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SigningSecretResponse {
	signing_secret: String,
}

#[derive(Deserialize)]
struct TokenQuery {
	email: Option<String>,
}

#[derive(Serialize)]
struct TokenResponse {
	token: String,
}

async fn get_kid(State(state): State<AppState>) -> ApiResult<Json<KidResponse>> {
	let material =
		state.store.ensure().await.map_err(ApiError::with_context("Failed to fetch kid"))?;

	Ok(Json(KidResponse { kid: material.key_id().to_owned() }))
}

async fn signing_secret(
	State(state): State<AppState>,
) -> ApiResult<Json<SigningSecretResponse>> {
	let material = state
		.store
		.ensure()
		.await
		.map_err(ApiError::with_context("Failed to fetch signing secret"))?;

	Ok(Json(SigningSecretResponse { signing_secret: material.signing_secret().to_owned() }))
}

async fn generate_token(
	State(state): State<AppState>,
	Query(query): Query<TokenQuery>,
) -> ApiResult<Json<TokenResponse>> {
	let Some(email) = query.email.filter(|email| !email.trim().is_empty()) else {
		return Err(ApiError::bad_request("Email is required"));
	};
	let token = state
		.issuer
		.issue(&email)
		.await
		.map_err(ApiError::with_context("Failed to generate token"))?;

	Ok(Json(TokenResponse { token }))
}

async fn public_key(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
	let material = state
		.store
		.ensure()
		.await
		.map_err(ApiError::with_context("Failed to fetch public key"))?;

	Ok((
		[(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
		material.public_key_pem().to_owned(),
	))
}

async fn openid_configuration(headers: HeaderMap) -> ApiResult<Json<DiscoveryDocument>> {
	let host = headers
		.get(header::HOST)
		.and_then(|value| value.to_str().ok())
		.filter(|host| !host.trim().is_empty())
		.ok_or_else(|| ApiError::bad_request("Host header is required"))?;

	Ok(Json(DiscoveryDocument::for_host(host)))
}

async fn jwks_document(State(state): State<AppState>) -> ApiResult<Json<JwkSet>> {
	let set =
		jwks::export(&state.store).await.map_err(ApiError::with_context("Failed to fetch JWKS"))?;

	Ok(Json(set))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<StoreStatus>) {
	let status = state.store.status().await;
	let code = if status.ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

	(code, Json(status))
}

#[cfg(feature = "prometheus")]
async fn prometheus_metrics() -> Response {
	match crate::metrics::prometheus_handle() {
		Some(handle) => handle.render().into_response(),
		None => StatusCode::NOT_FOUND.into_response(),
	}
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::warn!(error = %err, "failed to listen for shutdown signal");
	}

	tracing::info!("shutdown signal received");
}
