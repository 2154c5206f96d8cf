//! JWK Set export of the cached public key.

// crates.io
use jsonwebtoken::jwk::{
	AlgorithmParameters, CommonParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
	RSAKeyParameters, RSAKeyType,
};
// self
use crate::{
	_prelude::*,
	cache::KeyStore,
	keys::{KeyMaterial, RsaComponents},
};

/// Convert key material into its RS256 signature JWK.
///
/// The modulus and exponent are read from the parsed RSA key, never from the PEM text.
pub fn to_jwk(material: &KeyMaterial) -> Result<Jwk> {
	let RsaComponents { n, e } = RsaComponents::from_public_pem(material.public_key_pem())?;

	Ok(Jwk {
		common: CommonParameters {
			public_key_use: Some(PublicKeyUse::Signature),
			key_algorithm: Some(KeyAlgorithm::RS256),
			key_id: Some(material.key_id().to_owned()),
			..Default::default()
		},
		algorithm: AlgorithmParameters::RSA(RSAKeyParameters { key_type: RSAKeyType::RSA, n, e }),
	})
}

/// Export the single-entry key set, fetching key material first if none is cached.
#[tracing::instrument(skip_all)]
pub async fn export(store: &KeyStore) -> Result<JwkSet> {
	let material = store.ensure().await?;

	Ok(JwkSet { keys: vec![to_jwk(&material)?] })
}
