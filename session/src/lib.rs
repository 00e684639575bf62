//! The crypto session used by the oracle to turn byte buffers into
//! program-consumable text, hashes and signatures.
//!
//! The session is a capability boundary: the orchestrator only relies on
//! the operations being deterministic and their textual output being stable
//! across runs. [`SchnorrSession`] is the concrete session shipped with the
//! service; a session binding to a Poseidon-native library can replace it
//! without touching any caller.

pub mod chunk;
pub mod encoders;
pub mod schnorr;

use std::collections::HashMap;

use oracle_shared::{EncodingOptions, OracleError, ResponseFormat, Result};

pub use encoders::MetaHeaderLengths;
pub use schnorr::SchnorrSession;

/// An enclave-resident private signing key.
///
/// Only ever constructed through [`CryptoSession::new_private_key`]; the
/// raw scalar stays inside this crate.
pub struct PrivateKey(pub(crate) [u8; 32]);

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Capability object for message formatting, hashing and signing.
///
/// Implementations must be `Send + Sync`: the service shares one session
/// between all request tasks, and this bound is the documented reentrancy
/// contract. All operations must be deterministic.
pub trait CryptoSession: Send + Sync {
    /// Canonical chunked text form of a byte buffer, split into `chunks`
    /// groups of 16-byte fields.
    fn format_message(&self, bytes: &[u8], chunks: usize) -> Result<String>;

    fn hash(&self, bytes: &[u8]) -> Result<[u8; 32]>;

    /// Textual form of [`CryptoSession::hash`] over the same bytes.
    fn hash_to_string(&self, bytes: &[u8]) -> Result<String>;

    /// Deterministic signature over a 32-byte digest.
    fn sign(&self, key: &PrivateKey, digest: &[u8; 32]) -> Result<String>;

    /// Create a fresh signing key and its public address. Called once per
    /// process at startup.
    fn new_private_key(&self) -> Result<(PrivateKey, String)>;

    // Field encoders for the canonical request encoding. Their output is
    // opaque to callers but fixed by the verifier contract.

    fn encode_attestation_data(&self, data: &str, options: &EncodingOptions) -> Result<Vec<u8>>;

    fn encode_response_format(&self, format: ResponseFormat) -> [u8; 16];

    fn encode_encoding_options(&self, options: &EncodingOptions) -> Result<[u8; 16]>;

    fn encode_headers(&self, headers: &HashMap<String, String>) -> Vec<u8>;

    fn encode_optional_fields(
        &self,
        html_result_type: Option<&str>,
        content_type: Option<&str>,
        body: Option<&str>,
    ) -> Vec<u8>;

    /// The 2-block header recording the six field lengths of the encoding.
    fn create_meta_header(&self, lengths: MetaHeaderLengths) -> [u8; 32];
}

/// Guard against sessions that silently drop message content.
pub(crate) fn check_chunks(chunks: usize) -> Result<()> {
    if chunks == 0 {
        return Err(OracleError::FormattingMessage);
    }
    Ok(())
}
