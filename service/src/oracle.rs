//! The oracle orchestrator: extraction, canonical encoding, hashing, quote
//! binding and signing for one request.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use oracle_attestation::{AttestationDevice, SgxInfo, generate_quote, sgx_info};
use oracle_encoding::{encode_request, zero_request_data};
use oracle_session::chunk::word_to_u128;
use oracle_session::{CryptoSession, PrivateKey};
use oracle_shared::{
    AttestationRequest, EncodingValue, NotarizationResponse, OracleData, OracleError,
    ResponseFormat, Result,
};

use crate::extract::html::extract_html;
use crate::extract::json::extract_json;
use crate::extract::{Extraction, http_client, truncate_decimals};
use crate::price_feed::fetch_price;
use crate::whitelist::DomainWhitelist;

/// Chunk counts of the two program-facing messages.
const USER_DATA_CHUNKS: usize = 8;
const REPORT_CHUNKS: usize = 10;

/// Measurement and signer identity served by `GET /info`.
#[derive(Debug, Clone, Serialize)]
pub struct EnclaveInfo {
    #[serde(flatten)]
    pub sgx: SgxInfo,
    pub signer_address: String,
}

/// Process-wide oracle state: the crypto session, the attestation device,
/// the outbound HTTP client and the enclave signing key.
pub struct Oracle<S: CryptoSession> {
    session: Arc<S>,
    device: AttestationDevice,
    client: reqwest::Client,
    whitelist: DomainWhitelist,
    signing_key: PrivateKey,
    address: String,
}

impl<S: CryptoSession> Oracle<S> {
    pub fn new(
        session: Arc<S>,
        device: AttestationDevice,
        whitelist: DomainWhitelist,
    ) -> Result<Self> {
        let (signing_key, address) = session.new_private_key()?;
        Ok(Self {
            client: http_client()?,
            session,
            device,
            whitelist,
            signing_key,
            address,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Notarize one request: validate, extract, encode, hash, bind the
    /// hash into an SGX quote and sign the result.
    pub async fn notarize(&self, req: AttestationRequest) -> Result<NotarizationResponse> {
        req.validate(|url| self.whitelist.is_accepted_domain(url))?;
        let timestamp = unix_now();
        let extraction = self.extract(&req, timestamp).await?;
        if req.debug_request {
            tracing::debug!(
                url = %req.url,
                status = extraction.status_code,
                value = %extraction.value,
                "extraction completed"
            );
        }
        let oracle_data = self.build_oracle_data(&req, &extraction, timestamp).await?;
        Ok(NotarizationResponse {
            attestation_data: extraction.value,
            response_body: extraction.response_body,
            response_status_code: extraction.status_code,
            attestation_timestamp: timestamp,
            oracle_data,
        })
    }

    /// The enclave's measurements plus the signer address.
    pub fn enclave_info(&self) -> Result<EnclaveInfo> {
        let info = sgx_info(&self.device)?;
        Ok(EnclaveInfo {
            sgx: info.clone(),
            signer_address: self.address.clone(),
        })
    }

    async fn extract(&self, req: &AttestationRequest, timestamp: u64) -> Result<Extraction> {
        if let Some(symbol) = req.price_feed()? {
            if req.encoding_value()? != EncodingValue::Float {
                return Err(OracleError::InvalidEncodingOption);
            }
            let feed = fetch_price(&self.client, symbol, timestamp).await?;
            return Ok(Extraction {
                value: truncate_decimals(&feed.price, req.encoding_options.precision),
                response_body: serde_json::to_string(&feed)
                    .map_err(|_| OracleError::ParsingJson)?,
                status_code: 200,
            });
        }
        match req.format()? {
            ResponseFormat::Json => extract_json(&self.client, req).await,
            ResponseFormat::Html => extract_html(&self.client, req).await,
        }
    }

    pub(crate) async fn build_oracle_data(
        &self,
        req: &AttestationRequest,
        extraction: &Extraction,
        timestamp: u64,
    ) -> Result<OracleData> {
        let encoded = encode_request(
            self.session.as_ref(),
            req,
            &extraction.value,
            u64::from(extraction.status_code),
            timestamp,
        )?;
        let user_data = self.session.format_message(&encoded.bytes, USER_DATA_CHUNKS)?;

        // The zeroed copy is the static request template contracts pin.
        let zeroed = zero_request_data(&encoded.bytes, &encoded.positions)?;
        let encoded_request = self.session.format_message(&zeroed, USER_DATA_CHUNKS)?;
        let request_hash_bytes = self.session.hash(encoded_request.as_bytes())?;
        let request_hash = self.session.hash_to_string(encoded_request.as_bytes())?;

        let timestamped_input = timestamped_hash_input(&request_hash_bytes, timestamp);
        let timestamped_request_hash =
            self.session.hash_to_string(timestamped_input.as_bytes())?;

        // The quote protocol is blocking pseudo-file I/O under the enclave
        // lock; it must run to completion even if the request is dropped.
        let device = self.device.clone();
        let quote =
            tokio::task::spawn_blocking(move || generate_quote(&device, &request_hash_bytes))
                .await
                .map_err(|_| OracleError::GeneratingQuote)??;

        let report = self.session.format_message(&quote, REPORT_CHUNKS)?;
        let report_hash = self.session.hash(report.as_bytes())?;
        let signature = self.session.sign(&self.signing_key, &report_hash)?;

        Ok(OracleData {
            user_data,
            encoded_request,
            encoded_positions: encoded.positions,
            request_hash,
            timestamped_request_hash,
            report,
            signature,
            address: self.address.clone(),
        })
    }
}

/// The struct text binding a request hash to its attestation timestamp.
///
/// Two 16-byte little-endian halves, each read as a `u128`: the first from
/// the request hash, the second carrying the timestamp (numerically equal
/// to it).
pub(crate) fn timestamped_hash_input(request_hash: &[u8; 32], timestamp: u64) -> String {
    let mut hash_half = [0u8; 16];
    hash_half.copy_from_slice(&request_hash[..16]);
    let request_chunk = word_to_u128(&hash_half);

    let mut timestamp_half = [0u8; 16];
    timestamp_half[..8].copy_from_slice(&timestamp.to_le_bytes());
    let timestamp_chunk = word_to_u128(&timestamp_half);

    format!("{{ request_hash: {request_chunk}u128, attestation_timestamp: {timestamp_chunk}u128 }}")
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use oracle_attestation::QUOTE_MIN_SIZE;
    use oracle_attestation::device::{QUOTE, USER_REPORT_DATA};
    use oracle_session::schnorr::{SchnorrSession, verify};
    use oracle_shared::EncodingOptions;

    use super::*;

    fn request() -> AttestationRequest {
        AttestationRequest {
            url: "api.example.com/v1/price".into(),
            request_method: "GET".into(),
            selector: "data.price".into(),
            response_format: "json".into(),
            html_result_type: None,
            request_body: None,
            request_content_type: None,
            request_headers: HashMap::new(),
            encoding_options: EncodingOptions {
                value: "float".into(),
                precision: 2,
            },
            debug_request: false,
        }
    }

    fn oracle_with_device() -> (tempfile::TempDir, Oracle<SchnorrSession>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(USER_REPORT_DATA), b"").unwrap();
        std::fs::write(dir.path().join(QUOTE), vec![0x5au8; QUOTE_MIN_SIZE]).unwrap();
        let oracle = Oracle::new(
            Arc::new(SchnorrSession::new()),
            AttestationDevice::new(dir.path()),
            DomainWhitelist::new(["api.example.com".to_string()]),
        )
        .unwrap();
        (dir, oracle)
    }

    #[test]
    fn timestamped_input_embeds_the_timestamp_numerically() {
        let mut hash = [0u8; 32];
        hash[0] = 7;
        let text = timestamped_hash_input(&hash, 1_700_000_000);
        assert_eq!(
            text,
            "{ request_hash: 7u128, attestation_timestamp: 1700000000u128 }"
        );
    }

    #[tokio::test]
    async fn oracle_data_is_deterministic_for_identical_inputs() {
        let (_dir, oracle) = oracle_with_device();
        let extraction = Extraction {
            response_body: r#"{"data":{"price":12345.6789}}"#.into(),
            value: "12345.67".into(),
            status_code: 200,
        };
        let timestamp = 1_700_000_000;

        let a = oracle
            .build_oracle_data(&request(), &extraction, timestamp)
            .await
            .unwrap();
        let b = oracle
            .build_oracle_data(&request(), &extraction, timestamp)
            .await
            .unwrap();

        assert_eq!(a, b);
        assert!(a.request_hash.ends_with("field"));
        assert_ne!(a.user_data, a.encoded_request);
    }

    #[tokio::test]
    async fn the_report_is_the_wrapped_quote_and_its_signature_verifies() {
        let (_dir, oracle) = oracle_with_device();
        let extraction = Extraction {
            response_body: "{}".into(),
            value: "1.00".into(),
            status_code: 200,
        };
        let data = oracle
            .build_oracle_data(&request(), &extraction, 1_700_000_000)
            .await
            .unwrap();

        // the quote file is all 0x5a; its evidence framing starts 01,02 LE
        let session = SchnorrSession::new();
        let mut evidence = vec![1, 0, 0, 0, 2, 0, 0, 0];
        evidence.extend_from_slice(&(QUOTE_MIN_SIZE as u64).to_le_bytes());
        evidence.extend_from_slice(&vec![0x5au8; QUOTE_MIN_SIZE]);
        assert_eq!(data.report, session.format_message(&evidence, 10).unwrap());

        let report_hash = session.hash(data.report.as_bytes()).unwrap();
        assert!(verify(&data.address, &report_hash, &data.signature));
    }

    #[tokio::test]
    async fn price_feed_requests_must_encode_floats() {
        let (_dir, oracle) = oracle_with_device();
        let mut req = request();
        req.url = "price_feed: btc".into();
        req.encoding_options.value = "string".into();
        assert!(matches!(
            oracle.notarize(req).await,
            Err(OracleError::InvalidEncodingOption)
        ));
    }

    #[tokio::test]
    async fn non_whitelisted_hosts_never_reach_extraction() {
        let (_dir, oracle) = oracle_with_device();
        let mut req = request();
        req.url = "evil.example.com/v1".into();
        assert!(matches!(
            oracle.notarize(req).await,
            Err(OracleError::UnacceptedDomain(_))
        ));
    }
}
