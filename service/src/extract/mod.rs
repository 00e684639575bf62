//! Attestation data extraction from external sources.

pub mod html;
pub mod json;

use std::time::Duration;

use oracle_shared::{AttestationRequest, OracleError, RequestMethod, Result};

/// Per-request timeout of the JSON extractor and the shared client default.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The outcome of one extraction: the upstream body, the selected value
/// and the upstream status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub response_body: String,
    pub value: String,
    pub status_code: u16,
}

/// The shared outbound HTTP client.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| OracleError::BuildingRequest(e.to_string()))
}

/// Assemble the outbound request: implicit `https://` scheme, method,
/// user headers and, for POST, body and content type.
pub(crate) fn build_request(
    client: &reqwest::Client,
    req: &AttestationRequest,
) -> Result<reqwest::RequestBuilder> {
    let url = format!("https://{}", req.url);
    let mut builder = match req.method()? {
        RequestMethod::Get => client.get(&url),
        RequestMethod::Post => {
            let body = req
                .request_body
                .clone()
                .ok_or(OracleError::MissingRequestBody)?;
            let mut post = client.post(&url).body(body);
            if let Some(content_type) = &req.request_content_type {
                post = post.header(reqwest::header::CONTENT_TYPE, content_type);
            }
            post
        }
    };
    for (key, value) in &req.request_headers {
        builder = builder.header(key, value);
    }
    Ok(builder)
}

/// Cut a numeric string down to at most `precision` decimal digits,
/// without rounding. With a precision of zero the decimal point goes too.
pub(crate) fn truncate_decimals(value: &str, precision: u8) -> String {
    let Some(dot) = value.find('.') else {
        return value.to_string();
    };
    let decimals = &value[dot + 1..];
    let kept = &decimals[..decimals.len().min(usize::from(precision))];
    if kept.is_empty() {
        value[..dot].to_string()
    } else {
        format!("{}.{kept}", &value[..dot])
    }
}

/// Map an upstream error status onto the fetch error carrying it.
pub(crate) fn check_status(status: u16) -> Result<()> {
    if status >= 400 {
        return Err(OracleError::FetchingData {
            status: Some(status),
        });
    }
    Ok(())
}
