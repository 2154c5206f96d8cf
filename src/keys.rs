//! Key material model, key identifier derivation, and RSA public parameter extraction.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// crates.io
use base64::prelude::*;
use rsa::{
	RsaPublicKey, pkcs1::DecodeRsaPublicKey, pkcs8::DecodePublicKey, traits::PublicKeyParts,
};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Derive the key identifier (`kid`) for a PEM-encoded public key.
///
/// The identifier is the lowercase hex SHA-256 digest of the exact input bytes, so any change to
/// the text, including whitespace and line endings, yields a different identifier.
pub fn derive_key_id(public_key_pem: &str) -> String {
	format!("{:x}", Sha256::digest(public_key_pem.as_bytes()))
}

/// Signing key pair, its identifier, and the shared signing secret, fetched together.
///
/// The identifier is computed from the public key on construction and cannot be set
/// independently.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
	private_key_pem: Arc<str>,
	public_key_pem: Arc<str>,
	key_id: Arc<str>,
	signing_secret: Arc<str>,
}
impl KeyMaterial {
	/// Bundle freshly fetched values, deriving the key identifier from `public_key_pem`.
	pub fn new(
		private_key_pem: impl Into<Arc<str>>,
		public_key_pem: impl Into<Arc<str>>,
		signing_secret: impl Into<Arc<str>>,
	) -> Self {
		let public_key_pem = public_key_pem.into();
		let key_id = derive_key_id(&public_key_pem).into();

		Self {
			private_key_pem: private_key_pem.into(),
			public_key_pem,
			key_id,
			signing_secret: signing_secret.into(),
		}
	}

	/// PEM-encoded RSA private key used for signing.
	pub fn private_key_pem(&self) -> &str {
		&self.private_key_pem
	}

	/// PEM-encoded RSA public key, exactly as fetched.
	pub fn public_key_pem(&self) -> &str {
		&self.public_key_pem
	}

	/// Key identifier derived from [`Self::public_key_pem`].
	pub fn key_id(&self) -> &str {
		&self.key_id
	}

	/// Shared signing secret.
	pub fn signing_secret(&self) -> &str {
		&self.signing_secret
	}
}
impl Debug for KeyMaterial {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("KeyMaterial")
			.field("key_id", &self.key_id)
			.field("public_key_pem", &self.public_key_pem)
			.field("private_key_pem", &"<redacted>")
			.field("signing_secret", &"<redacted>")
			.finish()
	}
}

/// RSA public parameters encoded for a JWK (`n` and `e`, base64url without padding).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaComponents {
	/// Big-endian modulus.
	pub n: String,
	/// Big-endian public exponent.
	pub e: String,
}
impl RsaComponents {
	/// Parse an SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM document.
	pub fn from_public_pem(pem: &str) -> Result<Self> {
		let pem = pem.trim();
		let key = RsaPublicKey::from_public_key_pem(pem)
			.or_else(|spki_err| {
				RsaPublicKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
					Error::Serialization(format!(
						"Public key is neither SPKI ({spki_err}) nor PKCS#1 ({pkcs1_err})."
					))
				})
			})?;

		Ok(Self {
			n: BASE64_URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
			e: BASE64_URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
		})
	}
}
