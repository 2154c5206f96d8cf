//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the token issuer.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Dotenv(#[from] dotenvy::Error),
	#[error(transparent)]
	Jsonwebtoken(#[from] jsonwebtoken::errors::Error),
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error("Upstream HTTP status {status} from {url}: {body:?}")]
	HttpStatus { status: http::StatusCode, url: url::Url, body: Option<String> },
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Failed to acquire {resource}: {reason}")]
	KeyAcquisition { resource: &'static str, reason: String },
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Key serialization failed: {0}")]
	Serialization(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Whether the error came from retrieving key material from the remote source.
	pub fn is_key_acquisition(&self) -> bool {
		matches!(self, Self::KeyAcquisition { .. } | Self::HttpStatus { .. })
	}

	/// Whether the error was caused by missing or malformed caller input.
	pub fn is_invalid_request(&self) -> bool {
		matches!(self, Self::InvalidRequest(_))
	}
}
