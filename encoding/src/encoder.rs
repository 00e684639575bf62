//! The canonical request encoder.
//!
//! Layout: blocks 0-1 hold the meta-header, followed by attestation data,
//! timestamp, status code, url, selector, response format, method, encoding
//! options, request headers and optional fields, each padded to whole
//! blocks. Field positions are recorded while writing so verifiers can
//! address individual fields inside the buffer.

use std::str::FromStr;

use oracle_session::{CryptoSession, MetaHeaderLengths};
use oracle_shared::{
    ATTESTATION_DATA_SIZE_LIMIT, AttestationRequest, EncodingOptions, EncodingValue, OracleError,
    ProofPositionalInfo, Result, TARGET_ALIGNMENT,
};

use crate::layout::{PositionRecorder, number_to_bytes, pad_string_to_length, write_with_padding};

/// Width of the padded numeric attestation data strings.
const NUMERIC_DATA_WIDTH: usize = 255;

/// Number of blocks reserved for the meta-header.
const META_HEADER_BLOCKS: usize = 2;

/// An encoded request together with its field positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    pub bytes: Vec<u8>,
    pub positions: ProofPositionalInfo,
}

/// Normalize the extracted value into its fixed-width attestation data
/// form. Price feed values are taken verbatim; they were already truncated
/// to the requested precision.
pub fn prepare_attestation_data(
    value: &str,
    options: &EncodingOptions,
    price_feed: bool,
) -> Result<String> {
    if value.len() > ATTESTATION_DATA_SIZE_LIMIT {
        return Err(OracleError::AttestationDataTooLarge);
    }
    if price_feed {
        return Ok(value.to_string());
    }
    match EncodingValue::from_str(&options.value)? {
        EncodingValue::String => Ok(pad_string_to_length(
            value,
            '\0',
            ATTESTATION_DATA_SIZE_LIMIT,
        )),
        EncodingValue::Float => {
            if value.len() > NUMERIC_DATA_WIDTH {
                return Err(OracleError::AttestationDataTooLarge);
            }
            let mut data = value.to_string();
            if !data.contains('.') {
                data.push('.');
            }
            Ok(pad_string_to_length(&data, '0', NUMERIC_DATA_WIDTH))
        }
        EncodingValue::Int => {
            if value.len() > NUMERIC_DATA_WIDTH {
                return Err(OracleError::AttestationDataTooLarge);
            }
            let mut data = "0".repeat(NUMERIC_DATA_WIDTH - value.len());
            data.push_str(value);
            Ok(data)
        }
    }
}

/// Encode a validated request plus its extraction outcome into the
/// canonical buffer.
pub fn encode_request<S: CryptoSession>(
    session: &S,
    req: &AttestationRequest,
    value: &str,
    status_code: u64,
    timestamp: u64,
) -> Result<EncodedRequest> {
    let prepared = prepare_attestation_data(
        value,
        &req.encoding_options,
        req.price_feed()?.is_some(),
    )?;
    let data_bytes = session.encode_attestation_data(&prepared, &req.encoding_options)?;
    let headers_encoded = session.encode_headers(&req.request_headers);
    let optional_encoded = session.encode_optional_fields(
        req.html_result_type.as_deref(),
        req.request_content_type.as_deref(),
        req.request_body.as_deref(),
    );

    // Reserve the meta-header; it is back-filled once all lengths are known.
    let mut buf = vec![0u8; META_HEADER_BLOCKS * TARGET_ALIGNMENT];
    let mut recorder = PositionRecorder::new(META_HEADER_BLOCKS);
    let mut positions = ProofPositionalInfo::default();

    positions.data = recorder.record(write_with_padding(&mut buf, &data_bytes))?;
    positions.timestamp =
        recorder.record(write_with_padding(&mut buf, &number_to_bytes(timestamp)))?;
    positions.status_code =
        recorder.record(write_with_padding(&mut buf, &number_to_bytes(status_code)))?;
    positions.url = recorder.record(write_with_padding(&mut buf, req.url.as_bytes()))?;
    positions.selector = recorder.record(write_with_padding(&mut buf, req.selector.as_bytes()))?;
    positions.response_format = recorder.record(write_with_padding(
        &mut buf,
        &session.encode_response_format(req.format()?),
    ))?;
    positions.method =
        recorder.record(write_with_padding(&mut buf, req.request_method.as_bytes()))?;
    positions.encoding_options = recorder.record(write_with_padding(
        &mut buf,
        &session.encode_encoding_options(&req.encoding_options)?,
    ))?;
    positions.request_headers = recorder.record(write_with_padding(&mut buf, &headers_encoded))?;
    positions.optional_fields =
        recorder.record(write_with_padding(&mut buf, &optional_encoded))?;

    let lengths = MetaHeaderLengths {
        attestation_data: guard_u16(data_bytes.len())?,
        method: guard_u16(req.request_method.len())?,
        url: guard_u16(req.url.len())?,
        selector: guard_u16(req.selector.len())?,
        request_headers: guard_u16(headers_encoded.len())?,
        optional_fields: guard_u16(optional_encoded.len())?,
    };
    let header = session.create_meta_header(lengths);
    buf[..META_HEADER_BLOCKS * TARGET_ALIGNMENT].copy_from_slice(&header);

    if buf.len() % TARGET_ALIGNMENT != 0 {
        return Err(OracleError::PreparationCritical(
            "encoded buffer is not block aligned".into(),
        ));
    }

    Ok(EncodedRequest {
        bytes: buf,
        positions,
    })
}

/// The static request template: the encoded buffer with its data and
/// timestamp blocks overwritten with zero.
pub fn zero_request_data(encoded: &[u8], positions: &ProofPositionalInfo) -> Result<Vec<u8>> {
    let start = META_HEADER_BLOCKS * TARGET_ALIGNMENT;
    let zeroed_blocks = usize::from(positions.data.len) + usize::from(positions.timestamp.len);
    let end = start + zeroed_blocks * TARGET_ALIGNMENT;
    if end > encoded.len() {
        return Err(OracleError::UserDataTooShort);
    }
    let mut out = encoded.to_vec();
    out[start..end].fill(0);
    Ok(out)
}

fn guard_u16(len: usize) -> Result<u16> {
    u16::try_from(len)
        .map_err(|_| OracleError::PreparationCritical("encoded field exceeds u16".into()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use oracle_session::SchnorrSession;
    use oracle_shared::ATTESTATION_DATA_SIZE_LIMIT;

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
            request_headers: HashMap::from([("Accept".to_string(), "application/json".to_string())]),
            encoding_options: EncodingOptions {
                value: "float".into(),
                precision: 2,
            },
            debug_request: false,
        }
    }

    #[test]
    fn float_preparation_ensures_a_decimal_point() {
        let options = EncodingOptions {
            value: "float".into(),
            precision: 2,
        };
        let with_dot = prepare_attestation_data("12.5", &options, false).unwrap();
        assert_eq!(with_dot.len(), 255);
        assert!(with_dot.starts_with("12.5000"));

        let without_dot = prepare_attestation_data("125", &options, false).unwrap();
        assert!(without_dot.starts_with("125.000"));
    }

    #[test]
    fn integer_preparation_left_pads() {
        let options = EncodingOptions {
            value: "integer".into(),
            precision: 0,
        };
        let prepared = prepare_attestation_data("42", &options, false).unwrap();
        assert_eq!(prepared.len(), 255);
        assert!(prepared.ends_with("42"));
        assert!(prepared.starts_with('0'));
    }

    #[test]
    fn string_preparation_pads_with_nul_to_the_limit() {
        let options = EncodingOptions {
            value: "string".into(),
            precision: 0,
        };
        let prepared = prepare_attestation_data("hello", &options, false).unwrap();
        assert_eq!(prepared.len(), ATTESTATION_DATA_SIZE_LIMIT);
        assert!(prepared.starts_with("hello"));
        assert_eq!(prepared.as_bytes()[5], 0);

        let oversized = "x".repeat(ATTESTATION_DATA_SIZE_LIMIT + 1);
        assert!(matches!(
            prepare_attestation_data(&oversized, &options, false),
            Err(OracleError::AttestationDataTooLarge)
        ));
    }

    #[test]
    fn price_feed_values_stay_verbatim() {
        let options = EncodingOptions {
            value: "float".into(),
            precision: 6,
        };
        assert_eq!(
            prepare_attestation_data("101.333333", &options, true).unwrap(),
            "101.333333"
        );
    }

    #[test]
    fn encoding_is_block_aligned() {
        let session = SchnorrSession::new();
        let encoded = encode_request(&session, &request(), "12345.67", 200, 1_700_000_000).unwrap();
        assert_eq!(encoded.bytes.len() % TARGET_ALIGNMENT, 0);
    }

    #[test]
    fn positions_cover_the_buffer_contiguously() {
        let session = SchnorrSession::new();
        let encoded = encode_request(&session, &request(), "12345.67", 200, 1_700_000_000).unwrap();
        let p = &encoded.positions;

        assert_eq!(p.data.pos, 2);
        // single-block numeric fields
        for info in [
            p.timestamp,
            p.status_code,
            p.response_format,
            p.method,
            p.encoding_options,
        ] {
            assert_eq!(info.len, 1);
        }

        // writer order: data, timestamp, status, url, selector, format,
        // method, options, headers, optionals
        let order = [
            p.data,
            p.timestamp,
            p.status_code,
            p.url,
            p.selector,
            p.response_format,
            p.method,
            p.encoding_options,
            p.request_headers,
            p.optional_fields,
        ];
        let mut expected = 2u16;
        for info in order {
            assert_eq!(info.pos, expected);
            expected += info.len;
        }
        assert_eq!(
            usize::from(expected) * TARGET_ALIGNMENT,
            encoded.bytes.len()
        );
    }

    #[test]
    fn fields_land_at_their_recorded_positions() {
        let session = SchnorrSession::new();
        let req = request();
        let timestamp = 1_700_000_000u64;
        let encoded = encode_request(&session, &req, "12345.67", 200, timestamp).unwrap();
        let p = &encoded.positions;

        let block = |info: oracle_shared::PositionInfo| {
            let start = usize::from(info.pos) * TARGET_ALIGNMENT;
            &encoded.bytes[start..start + usize::from(info.len) * TARGET_ALIGNMENT]
        };

        assert_eq!(block(p.timestamp), number_to_bytes(timestamp));
        assert_eq!(block(p.status_code), number_to_bytes(200));
        assert_eq!(&block(p.url)[..req.url.len()], req.url.as_bytes());
        assert_eq!(&block(p.method)[..3], b"GET");
    }

    #[test]
    fn meta_header_matches_the_recorded_lengths() {
        let session = SchnorrSession::new();
        let req = request();
        let encoded = encode_request(&session, &req, "12345.67", 200, 1_700_000_000).unwrap();

        let u16_at = |off: usize| {
            u16::from_le_bytes([encoded.bytes[off], encoded.bytes[off + 1]])
        };
        assert_eq!(u16_at(0), 255); // prepared float width
        assert_eq!(u16_at(2), 3); // "GET"
        assert_eq!(u16_at(4), req.url.len() as u16);
        assert_eq!(u16_at(6), req.selector.len() as u16);
        assert_eq!(
            u16_at(8),
            session.encode_headers(&req.request_headers).len() as u16
        );
    }

    #[test]
    fn zeroing_erases_exactly_data_and_timestamp() {
        let session = SchnorrSession::new();
        let encoded = encode_request(&session, &request(), "12345.67", 200, 1_700_000_000).unwrap();
        let zeroed = zero_request_data(&encoded.bytes, &encoded.positions).unwrap();

        let start = 2 * TARGET_ALIGNMENT;
        let end = start
            + (usize::from(encoded.positions.data.len)
                + usize::from(encoded.positions.timestamp.len))
                * TARGET_ALIGNMENT;
        assert!(zeroed[start..end].iter().all(|b| *b == 0));
        assert_eq!(zeroed[..start], encoded.bytes[..start]);
        assert_eq!(zeroed[end..], encoded.bytes[end..]);
    }

    #[test]
    fn zeroing_a_truncated_buffer_fails() {
        let session = SchnorrSession::new();
        let encoded = encode_request(&session, &request(), "12345.67", 200, 1_700_000_000).unwrap();
        let truncated = &encoded.bytes[..TARGET_ALIGNMENT * 4];
        assert!(matches!(
            zero_request_data(truncated, &encoded.positions),
            Err(OracleError::UserDataTooShort)
        ));
    }

    #[test]
    fn identical_inputs_encode_identically() {
        let session = SchnorrSession::new();
        let a = encode_request(&session, &request(), "12345.67", 200, 1_700_000_000).unwrap();
        let b = encode_request(&session, &request(), "12345.67", 200, 1_700_000_000).unwrap();
        assert_eq!(a, b);
    }
}
