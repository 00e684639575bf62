//! The attestation bundle returned to callers.

use serde::{Deserialize, Serialize};

use crate::positions::ProofPositionalInfo;

/// The proof material produced for one notarized request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OracleData {
    /// Chunked text form of the full encoded buffer.
    pub user_data: String,
    /// Same as `user_data` with the data and timestamp blocks zeroed. This
    /// is the static request template a verifier contract checks against.
    pub encoded_request: String,
    pub encoded_positions: ProofPositionalInfo,
    /// Hash of `encoded_request`.
    pub request_hash: String,
    /// Hash binding `request_hash` to the attestation timestamp.
    pub timestamped_request_hash: String,
    /// Chunked text form of the Open-Enclave-wrapped SGX quote.
    pub report: String,
    /// Schnorr signature over the hash of `report`.
    pub signature: String,
    /// Public address of the enclave signing key.
    pub address: String,
}

/// Everything `notarize` hands back for a successful request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotarizationResponse {
    /// The extracted value, exactly as encoded into the proof.
    pub attestation_data: String,
    /// The upstream response body the value was extracted from.
    pub response_body: String,
    pub response_status_code: u16,
    /// Unix seconds at which the attestation was produced.
    pub attestation_timestamp: u64,
    pub oracle_data: OracleData,
}
