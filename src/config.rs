//! Environment-driven configuration.

// std
use std::{
	collections::HashMap,
	env,
	io::ErrorKind,
	net::SocketAddr,
	path::{Path, PathBuf},
};
// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::{_prelude::*, token::TokenSettings};

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Remote locations serving the key pair and the signing secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySources {
	/// URL returning the PEM-encoded RSA private key.
	pub private_key_url: Url,
	/// URL returning the PEM-encoded RSA public key.
	pub public_key_url: Url,
	/// URL returning `{ "secret": string }`.
	pub signing_secret_url: Url,
}
impl KeySources {
	/// Parse the three remote locations.
	pub fn new(
		private_key_url: impl AsRef<str>,
		public_key_url: impl AsRef<str>,
		signing_secret_url: impl AsRef<str>,
	) -> Result<Self> {
		Ok(Self {
			private_key_url: Url::parse(private_key_url.as_ref())?,
			public_key_url: Url::parse(public_key_url.as_ref())?,
			signing_secret_url: Url::parse(signing_secret_url.as_ref())?,
		})
	}
}

/// Process configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// Socket address the HTTP server binds to.
	pub bind_address: SocketAddr,
	/// Remote key material locations.
	pub sources: KeySources,
	/// Claims and lifetime applied to issued tokens.
	pub token: TokenSettings,
}
impl Config {
	/// Load configuration from environment variables.
	pub fn from_env() -> Result<Self> {
		Self::from_vars(&env::vars().collect())
	}

	/// Load configuration from a map of variables (for testing).
	pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
		let sources = KeySources {
			private_key_url: required_url(vars, "PRIVATE_KEY_URL")?,
			public_key_url: required_url(vars, "PUBLIC_KEY_URL")?,
			signing_secret_url: required_url(vars, "SIGNING_SECRET_URL")?,
		};
		let host = vars.get("BIND_HOST").map(String::as_str).unwrap_or(DEFAULT_BIND_HOST);
		let port = match vars.get("PORT") {
			Some(raw) => raw.parse::<u16>().map_err(|err| Error::Validation {
				field: "PORT",
				reason: format!("Invalid port {raw:?}: {err}."),
			})?,
			None => DEFAULT_PORT,
		};
		let bind_address =
			format!("{host}:{port}").parse::<SocketAddr>().map_err(|err| Error::Validation {
				field: "BIND_HOST",
				reason: format!("Invalid bind address {host}:{port}: {err}."),
			})?;
		let mut token = TokenSettings::default();

		if let Some(audience) = vars.get("TOKEN_AUDIENCE") {
			token.audience = audience.clone();
		}
		if let Some(issuer) = vars.get("TOKEN_ISSUER") {
			token.issuer = issuer.clone();
		}
		if let Some(scope) = vars.get("TOKEN_SCOPE") {
			token.scope = scope.clone();
		}
		if let Some(raw) = vars.get("TOKEN_TTL_SECS") {
			let secs = raw.parse::<u64>().map_err(|err| Error::Validation {
				field: "TOKEN_TTL_SECS",
				reason: format!("Invalid number {raw:?}: {err}."),
			})?;

			token.ttl = Duration::from_secs(secs);
		}

		token.validate()?;

		Ok(Self { bind_address, sources, token })
	}
}

/// Load variables from a `.env` file in the working directory or one of its parents.
///
/// Returns the loaded path, or `None` when no file exists. Variables already set in the process
/// environment are kept.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
	match dotenvy::dotenv() {
		Ok(path) => Ok(Some(path)),
		Err(err) if is_not_found(&err) => Ok(None),
		Err(err) => Err(err.into()),
	}
}

/// Load variables from the `.env`-formatted file at `path`.
pub fn load_dotenv_from(path: &Path) -> Result<Option<PathBuf>> {
	match dotenvy::from_path(path) {
		Ok(()) => Ok(Some(path.to_path_buf())),
		Err(err) if is_not_found(&err) => Ok(None),
		Err(err) => Err(err.into()),
	}
}

fn is_not_found(err: &dotenvy::Error) -> bool {
	matches!(err, dotenvy::Error::Io(io) if io.kind() == ErrorKind::NotFound)
}

fn required_url(vars: &HashMap<String, String>, field: &'static str) -> Result<Url> {
	let raw = vars.get(field).ok_or_else(|| Error::Validation {
		field,
		reason: "Missing required environment variable.".into(),
	})?;

	Url::parse(raw).map_err(|err| Error::Validation {
		field,
		reason: format!("Invalid URL {raw:?}: {err}."),
	})
}
