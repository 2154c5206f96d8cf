//! HTTP client integration for key material retrieval.

// crates.io
use reqwest::{Client, Response, redirect::Policy};
use serde::Deserialize;
use url::Url;
// self
use crate::{_prelude::*, config::KeySources, http::KeyFetcher, keys::KeyMaterial};

/// Maximum redirect depth followed when fetching key material.
pub const MAX_REDIRECTS: usize = 10;

/// Fetches PEM keys and the signing secret over plain, unauthenticated HTTP GET.
#[derive(Clone, Debug)]
pub struct HttpKeyFetcher {
	client: Client,
	sources: KeySources,
}
impl HttpKeyFetcher {
	/// Build a fetcher with the default reqwest client.
	pub fn new(sources: KeySources) -> Result<Self> {
		let client = Client::builder()
			.redirect(Policy::limited(MAX_REDIRECTS))
			.user_agent(format!("oidc-key-issuer/{}", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self::with_client(sources, client))
	}

	/// Build a fetcher using the supplied HTTP client (primarily for tests).
	pub fn with_client(sources: KeySources, client: Client) -> Self {
		Self { client, sources }
	}

	async fn get(&self, resource: &'static str, url: &Url) -> Result<Response> {
		let start = Instant::now();
		let response = self
			.client
			.get(url.clone())
			.send()
			.await
			.map_err(|err| Error::KeyAcquisition { resource, reason: err.to_string() })?;
		let status = response.status();

		if !status.is_success() {
			let body = response.text().await.ok();

			return Err(Error::HttpStatus { status, url: url.clone(), body });
		}

		tracing::debug!(resource, %status, elapsed = ?start.elapsed(), "remote fetch complete");

		Ok(response)
	}

	async fn fetch_pem(&self, resource: &'static str, url: &Url) -> Result<String> {
		let body = self
			.get(resource, url)
			.await?
			.text()
			.await
			.map_err(|err| Error::KeyAcquisition { resource, reason: err.to_string() })?;

		if !looks_like_pem(&body) {
			return Err(Error::KeyAcquisition {
				resource,
				reason: "Response body is not PEM-armoured key material.".into(),
			});
		}

		Ok(body)
	}

	async fn fetch_secret(&self) -> Result<String> {
		const RESOURCE: &str = "signing secret";

		let bytes = self
			.get(RESOURCE, &self.sources.signing_secret_url)
			.await?
			.bytes()
			.await
			.map_err(|err| Error::KeyAcquisition { resource: RESOURCE, reason: err.to_string() })?;
		let body: SecretBody = serde_json::from_slice(&bytes).map_err(|err| {
			Error::KeyAcquisition { resource: RESOURCE, reason: format!("Malformed body: {err}.") }
		})?;

		if body.secret.is_empty() {
			return Err(Error::KeyAcquisition {
				resource: RESOURCE,
				reason: "Secret field is empty.".into(),
			});
		}

		Ok(body.secret)
	}
}
#[async_trait::async_trait]
impl KeyFetcher for HttpKeyFetcher {
	#[tracing::instrument(skip(self))]
	async fn fetch(&self) -> Result<KeyMaterial> {
		let (private_key, public_key, secret) = tokio::try_join!(
			self.fetch_pem("private key", &self.sources.private_key_url),
			self.fetch_pem("public key", &self.sources.public_key_url),
			self.fetch_secret(),
		)?;

		Ok(KeyMaterial::new(private_key, public_key, secret))
	}
}

#[derive(Deserialize)]
struct SecretBody {
	secret: String,
}

fn looks_like_pem(body: &str) -> bool {
	let body = body.trim();

	body.starts_with("-----BEGIN ") && body.contains("-----END ")
}
