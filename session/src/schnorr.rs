//! The concrete crypto session: SHA-2 based hashing and Schnorr signatures
//! over the Ristretto group.

use std::collections::HashMap;

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand_core::OsRng;
use sha2::{Digest, Sha256, Sha512};

use oracle_shared::{EncodingOptions, ResponseFormat, Result};

use crate::chunk::{digest_chunks, format_message};
use crate::encoders::{self, MetaHeaderLengths};
use crate::{CryptoSession, PrivateKey};

const NONCE_TAG: &[u8] = b"oracle.session.nonce";
const CHALLENGE_TAG: &[u8] = b"oracle.session.challenge";

const SIGNATURE_PREFIX: &str = "sign1";
const ADDRESS_PREFIX: &str = "aleo1";

/// The session shipped with the service. Stateless and shareable between
/// request tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchnorrSession;

impl SchnorrSession {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoSession for SchnorrSession {
    fn format_message(&self, bytes: &[u8], chunks: usize) -> Result<String> {
        format_message(bytes, chunks)
    }

    fn hash(&self, bytes: &[u8]) -> Result<[u8; 32]> {
        Ok(Sha256::digest(bytes).into())
    }

    fn hash_to_string(&self, bytes: &[u8]) -> Result<String> {
        let digest = self.hash(bytes)?;
        let (lo, _) = digest_chunks(&digest);
        Ok(format!("{lo}field"))
    }

    fn sign(&self, key: &PrivateKey, digest: &[u8; 32]) -> Result<String> {
        let sk = Scalar::from_bytes_mod_order(key.0);
        let pk = RistrettoPoint::mul_base(&sk).compress();

        // Deterministic nonce bound to the key and the digest.
        let mut wide = Sha512::new();
        wide.update(NONCE_TAG);
        wide.update(key.0);
        wide.update(digest);
        let r = wide_scalar(&wide.finalize());
        let big_r = RistrettoPoint::mul_base(&r).compress();

        let c = challenge(&big_r, &pk, digest);
        let s = r + c * sk;

        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(big_r.as_bytes());
        sig[32..].copy_from_slice(s.as_bytes());
        Ok(format!("{SIGNATURE_PREFIX}{}", hex::encode(sig)))
    }

    fn new_private_key(&self) -> Result<(PrivateKey, String)> {
        let sk = Scalar::random(&mut OsRng);
        let pk = RistrettoPoint::mul_base(&sk).compress();
        let address = format!("{ADDRESS_PREFIX}{}", hex::encode(pk.as_bytes()));
        Ok((PrivateKey(sk.to_bytes()), address))
    }

    fn encode_attestation_data(&self, data: &str, options: &EncodingOptions) -> Result<Vec<u8>> {
        Ok(encoders::encode_attestation_data(data, options))
    }

    fn encode_response_format(&self, format: ResponseFormat) -> [u8; 16] {
        encoders::encode_response_format(format)
    }

    fn encode_encoding_options(&self, options: &EncodingOptions) -> Result<[u8; 16]> {
        encoders::encode_encoding_options(options)
    }

    fn encode_headers(&self, headers: &HashMap<String, String>) -> Vec<u8> {
        encoders::encode_headers(headers)
    }

    fn encode_optional_fields(
        &self,
        html_result_type: Option<&str>,
        content_type: Option<&str>,
        body: Option<&str>,
    ) -> Vec<u8> {
        encoders::encode_optional_fields(html_result_type, content_type, body)
    }

    fn create_meta_header(&self, lengths: MetaHeaderLengths) -> [u8; 32] {
        encoders::create_meta_header(lengths)
    }
}

fn challenge(big_r: &CompressedRistretto, pk: &CompressedRistretto, digest: &[u8; 32]) -> Scalar {
    let mut wide = Sha512::new();
    wide.update(CHALLENGE_TAG);
    wide.update(big_r.as_bytes());
    wide.update(pk.as_bytes());
    wide.update(digest);
    wide_scalar(&wide.finalize())
}

fn wide_scalar(output: &[u8]) -> Scalar {
    let mut wide = [0u8; 64];
    wide.copy_from_slice(output);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Verify a signature produced by [`SchnorrSession::sign`] against the
/// signer's public address.
pub fn verify(address: &str, digest: &[u8; 32], signature: &str) -> bool {
    let Some(pk_hex) = address.strip_prefix(ADDRESS_PREFIX) else {
        return false;
    };
    let Some(sig_hex) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let (Ok(pk_bytes), Ok(sig_bytes)) = (hex::decode(pk_hex), hex::decode(sig_hex)) else {
        return false;
    };
    if pk_bytes.len() != 32 || sig_bytes.len() != 64 {
        return false;
    }
    let Ok(pk) = CompressedRistretto::from_slice(&pk_bytes) else {
        return false;
    };
    let Ok(big_r) = CompressedRistretto::from_slice(&sig_bytes[..32]) else {
        return false;
    };
    let Some(pk_point) = pk.decompress() else {
        return false;
    };
    let Some(big_r_point) = big_r.decompress() else {
        return false;
    };
    let mut s_bytes = [0u8; 32];
    s_bytes.copy_from_slice(&sig_bytes[32..]);
    let Some(s) = Option::<Scalar>::from(Scalar::from_canonical_bytes(s_bytes)) else {
        return false;
    };
    let c = challenge(&big_r, &pk, digest);
    RistrettoPoint::mul_base(&s) == big_r_point + c * pk_point
}
