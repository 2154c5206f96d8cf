//! Remote retrieval of key material.

pub mod client;

// self
use crate::{_prelude::*, keys::KeyMaterial};

/// Source of key material.
///
/// Implementations perform I/O only; they never touch the cache. A failed fetch must return an
/// error rather than partial material.
#[async_trait::async_trait]
pub trait KeyFetcher: std::fmt::Debug + Send + Sync {
	/// Retrieve the private key, public key, and signing secret as one consistent bundle.
	async fn fetch(&self) -> Result<KeyMaterial>;
}
