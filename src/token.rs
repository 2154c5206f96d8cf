//! RS256 identity token issuance.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
// self
use crate::{_prelude::*, cache::KeyStore, keys::KeyMaterial, metrics};

/// Default `aud` claim.
pub const DEFAULT_AUDIENCE: &str = "embeddables_token";
/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "https://grove-rowan-armadillo.glitch.me/";
/// Default `scope` claim.
pub const DEFAULT_SCOPE: &str = "read:messages write:messages";
/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Fixed claims and lifetime applied to every issued token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSettings {
	/// `aud` claim.
	pub audience: String,
	/// `iss` claim.
	pub issuer: String,
	/// Space-delimited `scope` claim.
	pub scope: String,
	/// Lifetime measured from signing time.
	pub ttl: Duration,
}
impl TokenSettings {
	/// Validate settings invariants.
	pub fn validate(&self) -> Result<()> {
		if self.ttl.is_zero() {
			return Err(Error::Validation {
				field: "token.ttl",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.issuer.is_empty() {
			return Err(Error::Validation {
				field: "token.issuer",
				reason: "Must not be empty.".into(),
			});
		}

		Ok(())
	}
}
impl Default for TokenSettings {
	fn default() -> Self {
		Self {
			audience: DEFAULT_AUDIENCE.into(),
			issuer: DEFAULT_ISSUER.into(),
			scope: DEFAULT_SCOPE.into(),
			ttl: DEFAULT_TOKEN_TTL,
		}
	}
}

/// Claim set carried by issued tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Caller-supplied subject, typically an email address.
	pub sub: String,
	/// Audience.
	pub aud: String,
	/// Issuer URL.
	pub iss: String,
	/// Granted scopes.
	pub scope: String,
	/// Issued-at, unix seconds.
	pub iat: i64,
	/// Expiry, unix seconds.
	pub exp: i64,
}

/// Signs tokens with whatever key material the store currently holds.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
	store: KeyStore,
	settings: Arc<TokenSettings>,
}
impl TokenIssuer {
	/// Create an issuer over the given store.
	pub fn new(store: KeyStore, settings: TokenSettings) -> Self {
		Self { store, settings: Arc::new(settings) }
	}

	/// Settings applied to issued tokens.
	pub fn settings(&self) -> &TokenSettings {
		&self.settings
	}

	/// Issue a signed token for `subject`, fetching key material first if none is cached.
	#[tracing::instrument(skip_all)]
	pub async fn issue(&self, subject: &str) -> Result<String> {
		if subject.trim().is_empty() {
			return Err(Error::InvalidRequest("Subject is required.".into()));
		}

		let material = self.store.ensure().await?;
		let token = sign(&self.settings, &material, subject, Utc::now())?;

		metrics::record_token_issued();

		tracing::debug!(kid = %material.key_id(), "token issued");

		Ok(token)
	}
}

/// Build the claim set for `subject` as of `now`.
pub fn claims_for(settings: &TokenSettings, subject: &str, now: DateTime<Utc>) -> TokenClaims {
	let iat = now.timestamp();
	let ttl = i64::try_from(settings.ttl.as_secs()).unwrap_or(i64::MAX);

	TokenClaims {
		sub: subject.to_owned(),
		aud: settings.audience.clone(),
		iss: settings.issuer.clone(),
		scope: settings.scope.clone(),
		iat,
		exp: iat.saturating_add(ttl),
	}
}

/// Sign an RS256 token for `subject` with `material`, embedding its key identifier.
pub fn sign(
	settings: &TokenSettings,
	material: &KeyMaterial,
	subject: &str,
	now: DateTime<Utc>,
) -> Result<String> {
	let key = EncodingKey::from_rsa_pem(material.private_key_pem().as_bytes()).map_err(|err| {
		Error::Serialization(format!("Private key is not a usable RSA key: {err}."))
	})?;
	let mut header = Header::new(Algorithm::RS256);

	header.kid = Some(material.key_id().to_owned());

	let claims = claims_for(settings, subject, now);

	jsonwebtoken::encode(&header, &claims, &key)
		.map_err(|err| Error::Serialization(format!("Failed to sign token: {err}.")))
}
