//! The user-facing attestation request and its validation rules.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};
use crate::{FLOAT_MAX_PRECISION, PRICE_FEED_PREFIX};

/// How the extracted value is encoded into the attestation data field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncodingOptions {
    pub value: String,
    /// Number of decimal digits kept for float values. Ignored otherwise.
    #[serde(default)]
    pub precision: u8,
}

/// A request to notarize data from an external source.
///
/// Enum-like fields are kept as strings because their raw bytes are part of
/// the canonical encoding; [`AttestationRequest::validate`] narrows them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttestationRequest {
    /// Host plus path, without a scheme. `https://` is implied. The
    /// reserved `price_feed: {btc|eth|aleo}` values select the internal
    /// price feed aggregator.
    pub url: String,
    pub request_method: String,
    pub selector: String,
    pub response_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_result_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_content_type: Option<String>,
    #[serde(default)]
    pub request_headers: HashMap<String, String>,
    pub encoding_options: EncodingOptions,
    #[serde(default)]
    pub debug_request: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }
}

impl FromStr for RequestMethod {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(RequestMethod::Get),
            "POST" => Ok(RequestMethod::Post),
            other => Err(OracleError::InvalidRequestMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Html,
    Json,
}

impl FromStr for ResponseFormat {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "html" => Ok(ResponseFormat::Html),
            "json" => Ok(ResponseFormat::Json),
            other => Err(OracleError::InvalidResponseFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlResultType {
    /// The text content of the matched node.
    Value,
    /// The matched node re-serialized as HTML.
    Element,
}

impl FromStr for HtmlResultType {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "value" => Ok(HtmlResultType::Value),
            "element" => Ok(HtmlResultType::Element),
            other => Err(OracleError::InvalidHtmlResultType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingValue {
    String,
    Float,
    Int,
}

impl FromStr for EncodingValue {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(EncodingValue::String),
            "float" => Ok(EncodingValue::Float),
            "integer" => Ok(EncodingValue::Int),
            other => Err(OracleError::InvalidEncodingValue(other.to_string())),
        }
    }
}

/// Symbols served by the internal price feed aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceFeedSymbol {
    Btc,
    Eth,
    Aleo,
}

impl PriceFeedSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceFeedSymbol::Btc => "BTC",
            PriceFeedSymbol::Eth => "ETH",
            PriceFeedSymbol::Aleo => "ALEO",
        }
    }
}

impl AttestationRequest {
    /// The price feed symbol selected by the URL sentinel, if any.
    ///
    /// Fails only for a sentinel naming an unknown symbol; a plain URL
    /// yields `Ok(None)`.
    pub fn price_feed(&self) -> Result<Option<PriceFeedSymbol>> {
        let Some(rest) = self.url.strip_prefix(PRICE_FEED_PREFIX) else {
            return Ok(None);
        };
        match rest.trim() {
            "btc" => Ok(Some(PriceFeedSymbol::Btc)),
            "eth" => Ok(Some(PriceFeedSymbol::Eth)),
            "aleo" => Ok(Some(PriceFeedSymbol::Aleo)),
            other => Err(OracleError::UnknownPriceFeedSymbol(other.to_string())),
        }
    }

    pub fn method(&self) -> Result<RequestMethod> {
        self.request_method.parse()
    }

    pub fn format(&self) -> Result<ResponseFormat> {
        self.response_format.parse()
    }

    pub fn encoding_value(&self) -> Result<EncodingValue> {
        self.encoding_options.value.parse()
    }

    pub fn html_result(&self) -> Result<HtmlResultType> {
        self.html_result_type
            .as_deref()
            .ok_or(OracleError::MissingHtmlResultType)?
            .parse()
    }

    /// Check every request invariant, returning the first violation.
    ///
    /// `is_accepted_domain` is the external whitelist predicate; it is not
    /// consulted for price feed sentinels.
    pub fn validate(&self, is_accepted_domain: impl Fn(&str) -> bool) -> Result<()> {
        if self.url.is_empty() {
            return Err(OracleError::MissingUrl);
        }
        if self.request_method.is_empty() {
            return Err(OracleError::MissingRequestMethod);
        }
        let method = self.method()?;
        if method == RequestMethod::Post && self.request_body.is_none() {
            return Err(OracleError::MissingRequestBody);
        }
        if self.selector.is_empty() {
            return Err(OracleError::MissingSelector);
        }
        if self.response_format.is_empty() {
            return Err(OracleError::MissingResponseFormat);
        }
        if self.format()? == ResponseFormat::Html {
            self.html_result()?;
        }
        if self.encoding_options.value.is_empty() {
            return Err(OracleError::MissingEncodingValue);
        }
        if self.encoding_value()? == EncodingValue::Float
            && self.encoding_options.precision > FLOAT_MAX_PRECISION
        {
            return Err(OracleError::InvalidEncodingPrecision(
                self.encoding_options.precision,
            ));
        }
        if self.price_feed()?.is_none() {
            let host = host_of(&self.url);
            if !is_accepted_domain(host) {
                return Err(OracleError::UnacceptedDomain(host.to_string()));
            }
        }
        Ok(())
    }
}

/// The host part of a scheme-less URL, without any port suffix.
pub fn host_of(url: &str) -> &str {
    let host = url.split('/').next().unwrap_or(url);
    host.split(':').next().unwrap_or(host)
}
