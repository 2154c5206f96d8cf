//! Token issuer service binary.

// self
use oidc_key_issuer::{Config, Result, config, server, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
	// Before tracing so a `.env` file can also set `RUST_LOG`.
	let dotenv = config::load_dotenv();

	telemetry::init_tracing();

	match dotenv {
		Ok(Some(path)) => tracing::info!(path = %path.display(), "loaded .env file"),
		Ok(None) => {},
		Err(err) => tracing::warn!(error = %err, "failed to load .env file"),
	}

	#[cfg(feature = "prometheus")]
	oidc_key_issuer::metrics::install_default_exporter()?;

	let config = Config::from_env()
		.inspect_err(|err| tracing::error!(error = %err, "failed to load configuration"))?;

	tracing::info!(
		private_key_url = %config.sources.private_key_url,
		public_key_url = %config.sources.public_key_url,
		signing_secret_url = %config.sources.signing_secret_url,
		"configuration loaded"
	);

	server::serve(config).await
}
