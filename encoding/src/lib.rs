//! Canonical byte layout of attestation requests.
//!
//! The encoded buffer is the contract between the enclave and downstream
//! verifiers: 16-byte aligned, a 2-block meta-header, then the request
//! fields in fixed order at recorded block positions.

pub mod encoder;
pub mod layout;

pub use encoder::{EncodedRequest, encode_request, prepare_attestation_data, zero_request_data};
