//! Field encoders for the canonical request encoding.
//!
//! The byte shapes produced here are opaque to the encoder that lays them
//! out, but they are fixed by the verifier contract: a change to any of
//! them changes every request hash.

use std::collections::HashMap;
use std::str::FromStr;

use oracle_shared::{EncodingOptions, EncodingValue, OracleError, ResponseFormat, Result};

/// Raw (pre-padding) byte lengths recorded in the meta-header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaHeaderLengths {
    pub attestation_data: u16,
    pub method: u16,
    pub url: u16,
    pub selector: u16,
    pub request_headers: u16,
    pub optional_fields: u16,
}

/// A single block holding a number, little-endian in the lower 8 bytes.
fn number_block(n: u64) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..8].copy_from_slice(&n.to_le_bytes());
    block
}

pub fn encode_attestation_data(data: &str, _options: &EncodingOptions) -> Vec<u8> {
    data.as_bytes().to_vec()
}

pub fn encode_response_format(format: ResponseFormat) -> [u8; 16] {
    number_block(match format {
        ResponseFormat::Html => 0,
        ResponseFormat::Json => 1,
    })
}

pub fn encode_encoding_options(options: &EncodingOptions) -> Result<[u8; 16]> {
    let kind: u8 = match EncodingValue::from_str(&options.value)
        .map_err(|e| OracleError::PreparationCritical(e.to_string()))?
    {
        EncodingValue::String => 0,
        EncodingValue::Int => 1,
        EncodingValue::Float => 2,
    };
    let mut block = [0u8; 16];
    block[0] = kind;
    block[1] = options.precision;
    Ok(block)
}

/// Headers serialized in key order so the encoding is independent of map
/// iteration order.
pub fn encode_headers(headers: &HashMap<String, String>) -> Vec<u8> {
    let mut keys: Vec<&String> = headers.keys().collect();
    keys.sort();
    let mut out = String::new();
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(key);
        out.push(':');
        out.push_str(&headers[*key]);
    }
    out.into_bytes()
}

/// The three optional request fields, newline separated, absent ones empty.
pub fn encode_optional_fields(
    html_result_type: Option<&str>,
    content_type: Option<&str>,
    body: Option<&str>,
) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(html_result_type.unwrap_or(""));
    out.push('\n');
    out.push_str(content_type.unwrap_or(""));
    out.push('\n');
    out.push_str(body.unwrap_or(""));
    out.into_bytes()
}

/// The six field lengths as `u16` little-endian at offsets 0..12 of the
/// 2-block header; the remaining bytes stay zero.
pub fn create_meta_header(lengths: MetaHeaderLengths) -> [u8; 32] {
    let mut header = [0u8; 32];
    let fields = [
        lengths.attestation_data,
        lengths.method,
        lengths.url,
        lengths.selector,
        lengths.request_headers,
        lengths.optional_fields,
    ];
    for (i, len) in fields.iter().enumerate() {
        header[i * 2..i * 2 + 2].copy_from_slice(&len.to_le_bytes());
    }
    header
}
