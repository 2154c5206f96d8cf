//! OpenID-Connect-style token issuer: fetches remote RSA key material, derives a stable key
//! identifier, signs RS256 identity tokens, and publishes the public key as a JWK Set.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod config;
pub mod discovery;
pub mod http;
pub mod jwks;
pub mod keys;
pub mod metrics;
pub mod server;
pub mod telemetry;
pub mod token;

mod error;
mod _prelude {
	pub use std::{
		sync::Arc,
		time::Duration,
	};

	pub use chrono::{DateTime, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

pub use crate::{
	cache::{KeyStore, StoreState, StoreStatus},
	config::{Config, KeySources},
	discovery::DiscoveryDocument,
	error::{Error, Result},
	http::{KeyFetcher, client::HttpKeyFetcher},
	keys::{KeyMaterial, derive_key_id},
	server::{AppState, router},
	token::{TokenClaims, TokenIssuer, TokenSettings},
};
