//! Key material cache: lifecycle state, transitions, and the single-flight store.

pub mod entry;
pub mod manager;
pub mod state;

pub use manager::{KeyStore, StoreState, StoreStatus};
