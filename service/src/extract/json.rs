//! JSON extraction with a dot-and-bracket path selector.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use oracle_shared::{AttestationRequest, EncodingValue, OracleError, Result};

use super::{Extraction, build_request, check_status, truncate_decimals};

/// One selector part: an optional key followed by an optional `[index]`.
static SELECTOR_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)?(?:\[(\d+)\])?$").expect("selector grammar is valid"));

/// Fetch `req.url` and extract the selected value from its JSON body.
pub async fn extract_json(client: &reqwest::Client, req: &AttestationRequest) -> Result<Extraction> {
    let response = build_request(client, req)?
        .send()
        .await
        .map_err(|e| OracleError::FetchingData {
            status: e.status().map(|s| s.as_u16()),
        })?;
    let status_code = response.status().as_u16();
    check_status(status_code)?;

    let body: Value = response
        .json()
        .await
        .map_err(|_| OracleError::ParsingJson)?;
    let node = select(&body, &req.selector)?;
    let mut value = stringify(node);
    if req.encoding_value()? == EncodingValue::Float {
        value = truncate_decimals(&value, req.encoding_options.precision);
    }

    Ok(Extraction {
        // canonical re-serialization, stable for the lifetime of the process
        response_body: serde_json::to_string(&body).map_err(|_| OracleError::ParsingJson)?,
        value,
        status_code,
    })
}

/// Walk `selector` down from `root`.
///
/// `a.b[2].c` reads key `a`, then index 2 of array `b`, then key `c`.
/// `.[` is normalized to `[` first, so `b.[2]` means the same as `b[2]`.
/// Parts with an index but no key are refused; their meaning would be
/// ambiguous against a node that is already an array.
pub(crate) fn select<'v>(root: &'v Value, selector: &str) -> Result<&'v Value> {
    let normalized = selector.replace(".[", "[");
    let mut current = root;
    for part in normalized.split('.') {
        let captures = SELECTOR_PART
            .captures(part)
            .ok_or_else(|| OracleError::InvalidSelectorPart(part.to_string()))?;
        let key = captures.get(1).map(|m| m.as_str());
        let index = captures
            .get(2)
            .map(|m| m.as_str().parse::<usize>())
            .transpose()
            .map_err(|_| OracleError::InvalidSelectorPart(part.to_string()))?;

        let Some(key) = key else {
            return Err(OracleError::InvalidSelectorPart(part.to_string()));
        };
        current = match current {
            Value::Object(map) => map
                .get(key)
                .ok_or_else(|| OracleError::KeyNotFound(key.to_string()))?,
            _ => return Err(OracleError::InvalidMap(part.to_string())),
        };
        if let Some(index) = index {
            let Value::Array(items) = current else {
                return Err(OracleError::ExpectedArray(part.to_string()));
            };
            current = items
                .get(index)
                .ok_or(OracleError::IndexOutOfBound(index))?;
        }
    }
    Ok(current)
}

/// A node as attestation data text: strings verbatim, everything else in
/// its default JSON rendering.
pub(crate) fn stringify(node: &Value) -> String {
    match node {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
