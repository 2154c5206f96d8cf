//! OpenID discovery metadata.

// crates.io
use serde::{Deserialize, Serialize};

/// Path of the JWK Set relative to the issuer.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";
/// Path of the discovery document relative to the issuer.
pub const OPENID_CONFIGURATION_PATH: &str = "/.well-known/openid-configuration";

/// OpenID Provider metadata advertised at [`OPENID_CONFIGURATION_PATH`].
///
/// The authorization, token, and userinfo endpoints are advertised for relying parties but are
/// not served.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
	/// Issuer URL, always HTTPS.
	pub issuer: String,
	/// JWK Set location.
	pub jwks_uri: String,
	/// Authorization endpoint.
	pub authorization_endpoint: String,
	/// Token endpoint.
	pub token_endpoint: String,
	/// Userinfo endpoint.
	pub userinfo_endpoint: String,
	/// Supported `response_type` values.
	pub response_types_supported: Vec<String>,
	/// Supported subject identifier types.
	pub subject_types_supported: Vec<String>,
	/// Supported ID token signing algorithms.
	pub id_token_signing_alg_values_supported: Vec<String>,
}
impl DiscoveryDocument {
	/// Build the document for the host a request was addressed to, forcing HTTPS.
	pub fn for_host(host: &str) -> Self {
		let issuer = format!("https://{}", host.trim().trim_end_matches('/'));

		Self {
			jwks_uri: format!("{issuer}{JWKS_PATH}"),
			authorization_endpoint: format!("{issuer}/authorize"),
			token_endpoint: format!("{issuer}/token"),
			userinfo_endpoint: format!("{issuer}/userinfo"),
			response_types_supported: vec!["code".into(), "token".into()],
			subject_types_supported: vec!["public".into()],
			id_token_signing_alg_values_supported: vec!["RS256".into()],
			issuer,
		}
	}
}
