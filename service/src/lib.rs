//! The notarization oracle service.
//!
//! Ties the extractors, the canonical encoder, the crypto session and the
//! attestation device together into the `notarize` pipeline and exposes it
//! over HTTP.

pub mod config;
pub mod extract;
pub mod oracle;
pub mod price_feed;
pub mod server;
pub mod whitelist;

pub use oracle::{EnclaveInfo, Oracle};
pub use whitelist::DomainWhitelist;
