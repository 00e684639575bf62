//! Error type shared by every component of the oracle.
//!
//! Every error carries a stable numeric code: 1xxx validation, 2xxx enclave
//! I/O, 3xxx attestation pipeline, 4xxx extraction, 5xxx encoding writes,
//! 6xxx price feed, 7xxx request framing. The code and the screaming-case
//! name are part of the external contract; the display message is not.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Error, Debug)]
pub enum OracleError {
    // validation
    #[error("attestation target URL is required")]
    MissingUrl,
    #[error("request method is required")]
    MissingRequestMethod,
    #[error("unsupported request method: {0}")]
    InvalidRequestMethod(String),
    #[error("a request body is required for POST requests")]
    MissingRequestBody,
    #[error("selector is required")]
    MissingSelector,
    #[error("response format is required")]
    MissingResponseFormat,
    #[error("unsupported response format: {0}")]
    InvalidResponseFormat(String),
    #[error("an html result type is required for html responses")]
    MissingHtmlResultType,
    #[error("unsupported html result type: {0}")]
    InvalidHtmlResultType(String),
    #[error("encoding value is required")]
    MissingEncodingValue,
    #[error("unsupported encoding value: {0}")]
    InvalidEncodingValue(String),
    #[error("float precision {0} exceeds the supported maximum")]
    InvalidEncodingPrecision(u8),
    #[error("domain is not whitelisted: {0}")]
    UnacceptedDomain(String),

    // enclave I/O
    #[error("could not open attestation file {path}: {reason}")]
    EnclaveOpen { path: String, reason: String },
    #[error("could not write attestation file {path}: {reason}")]
    EnclaveWrite { path: String, reason: String },
    #[error("could not read attestation file {path}: {reason}")]
    EnclaveRead { path: String, reason: String },
    #[error("SGX report is malformed or too short")]
    ReadingReport,
    #[error("report data must not exceed {0} bytes")]
    InvalidSgxReportData(usize),
    #[error("SGX quote is smaller than the minimum credible size")]
    QuoteTooSmall,
    #[error("quote generation did not run to completion")]
    GeneratingQuote,

    // attestation pipeline
    #[error("could not format message for hashing")]
    FormattingMessage,
    #[error("hashing attestation data failed")]
    HashingData,
    #[error("signing the oracle report failed")]
    SigningReport,
    #[error("could not create the enclave signing key")]
    CreatingKey,

    // extraction
    #[error("could not build the attestation request: {0}")]
    BuildingRequest(String),
    #[error("fetching attestation data failed")]
    FetchingData { status: Option<u16> },
    #[error("could not decode the attestation response")]
    DecodingResponse,
    #[error("could not parse response body as JSON")]
    ParsingJson,
    #[error("selector part does not address an object: {0}")]
    InvalidMap(String),
    #[error("key not found in response: {0}")]
    KeyNotFound(String),
    #[error("selector part does not address an array: {0}")]
    ExpectedArray(String),
    #[error("array index out of bounds: {0}")]
    IndexOutOfBound(usize),
    #[error("invalid selector part: {0}")]
    InvalidSelectorPart(String),
    #[error("invalid xpath selector: {0}")]
    InvalidXpath(String),
    #[error("selector matched no nodes")]
    SelectorNotFound,
    #[error("could not parse HTML content")]
    ParsingHtmlContent,
    #[error("attestation data exceeds the supported size")]
    AttestationDataTooLarge,

    // encoding writes
    #[error("proof preparation failed: {0}")]
    PreparationCritical(String),
    #[error("encoded user data is too short for the recorded positions")]
    UserDataTooShort,

    // price feed
    #[error("price feeds require float encoding")]
    InvalidEncodingOption,
    #[error("unknown price feed symbol: {0}")]
    UnknownPriceFeedSymbol(String),
    #[error("fetching from {exchange} failed")]
    ExchangeFetch {
        exchange: &'static str,
        status: Option<u16>,
    },
    #[error("unexpected {0} response format")]
    InvalidExchangeFormat(&'static str),
    #[error("could not parse {0} price data")]
    ExchangeParseFailed(&'static str),
    #[error("fewer than two exchanges returned usable prices")]
    InsufficientExchangeData,

    // request framing
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
}

impl OracleError {
    /// Stable numeric error code.
    pub fn code(&self) -> u16 {
        use OracleError::*;
        match self {
            MissingUrl => 1001,
            MissingRequestMethod => 1002,
            InvalidRequestMethod(_) => 1003,
            MissingRequestBody => 1004,
            MissingSelector => 1005,
            MissingResponseFormat => 1006,
            InvalidResponseFormat(_) => 1007,
            MissingHtmlResultType => 1008,
            InvalidHtmlResultType(_) => 1009,
            MissingEncodingValue => 1010,
            InvalidEncodingValue(_) => 1011,
            InvalidEncodingPrecision(_) => 1012,
            UnacceptedDomain(_) => 1013,

            EnclaveOpen { .. } => 2001,
            EnclaveWrite { .. } => 2002,
            EnclaveRead { .. } => 2003,
            ReadingReport => 2004,
            InvalidSgxReportData(_) => 2005,
            QuoteTooSmall => 2006,
            GeneratingQuote => 2007,

            FormattingMessage => 3001,
            HashingData => 3002,
            SigningReport => 3003,
            CreatingKey => 3004,

            BuildingRequest(_) => 4001,
            FetchingData { .. } => 4002,
            DecodingResponse => 4003,
            ParsingJson => 4004,
            InvalidMap(_) => 4005,
            KeyNotFound(_) => 4006,
            ExpectedArray(_) => 4007,
            IndexOutOfBound(_) => 4008,
            InvalidSelectorPart(_) => 4009,
            InvalidXpath(_) => 4010,
            SelectorNotFound => 4011,
            ParsingHtmlContent => 4012,
            AttestationDataTooLarge => 4013,

            PreparationCritical(_) => 5001,
            UserDataTooShort => 5002,

            InvalidEncodingOption => 6001,
            UnknownPriceFeedSymbol(_) => 6002,
            ExchangeFetch { .. } => 6003,
            InvalidExchangeFormat(_) => 6004,
            ExchangeParseFailed(_) => 6005,
            InsufficientExchangeData => 6006,

            InvalidPayload(_) => 7001,
        }
    }

    /// Stable screaming-case identifier for the error.
    pub fn name(&self) -> &'static str {
        use OracleError::*;
        match self {
            MissingUrl => "MISSING_URL",
            MissingRequestMethod => "MISSING_REQUEST_METHOD",
            InvalidRequestMethod(_) => "INVALID_REQUEST_METHOD",
            MissingRequestBody => "MISSING_REQUEST_BODY",
            MissingSelector => "MISSING_SELECTOR",
            MissingResponseFormat => "MISSING_RESPONSE_FORMAT",
            InvalidResponseFormat(_) => "INVALID_RESPONSE_FORMAT",
            MissingHtmlResultType => "MISSING_HTML_RESULT_TYPE",
            InvalidHtmlResultType(_) => "INVALID_HTML_RESULT_TYPE",
            MissingEncodingValue => "MISSING_ENCODING_VALUE",
            InvalidEncodingValue(_) => "INVALID_ENCODING_VALUE",
            InvalidEncodingPrecision(_) => "INVALID_ENCODING_PRECISION",
            UnacceptedDomain(_) => "UNACCEPTED_DOMAIN",

            EnclaveOpen { .. } => "OPENING_ATTESTATION_FILE",
            EnclaveWrite { .. } => "WRITING_ATTESTATION_FILE",
            EnclaveRead { .. } => "READING_ATTESTATION_FILE",
            ReadingReport => "READING_REPORT",
            InvalidSgxReportData(_) => "INVALID_SGX_REPORT_SIZE",
            QuoteTooSmall => "QUOTE_TOO_SMALL",
            GeneratingQuote => "GENERATING_QUOTE",

            FormattingMessage => "FORMATTING_MESSAGE",
            HashingData => "HASHING_DATA",
            SigningReport => "SIGNING_REPORT",
            CreatingKey => "CREATING_KEY",

            BuildingRequest(_) => "BUILDING_REQUEST",
            FetchingData { .. } => "FETCHING_DATA",
            DecodingResponse => "DECODING_RESPONSE",
            ParsingJson => "PARSING_JSON_CONTENT",
            InvalidMap(_) => "INVALID_MAP",
            KeyNotFound(_) => "KEY_NOT_FOUND",
            ExpectedArray(_) => "EXPECTED_ARRAY",
            IndexOutOfBound(_) => "INDEX_OUT_OF_BOUND",
            InvalidSelectorPart(_) => "INVALID_SELECTOR_PART",
            InvalidXpath(_) => "INVALID_XPATH",
            SelectorNotFound => "SELECTOR_NOT_FOUND",
            ParsingHtmlContent => "PARSING_HTML_CONTENT",
            AttestationDataTooLarge => "ATTESTATION_DATA_TOO_LARGE",

            PreparationCritical(_) => "PREPARATION_CRITICAL",
            UserDataTooShort => "USER_DATA_TOO_SHORT",

            InvalidEncodingOption => "INVALID_ENCODING_OPTION",
            UnknownPriceFeedSymbol(_) => "UNKNOWN_PRICE_FEED_SYMBOL",
            ExchangeFetch { exchange, .. } => exchange_name(exchange, "_FETCH_FAILED"),
            InvalidExchangeFormat(exchange) => exchange_name(exchange, "_FORMAT"),
            ExchangeParseFailed(exchange) => exchange_name(exchange, "_PARSE_FAILED"),
            InsufficientExchangeData => "INSUFFICIENT_EXCHANGE_DATA",

            InvalidPayload(_) => "INVALID_PAYLOAD",
        }
    }

    /// The upstream HTTP status attached to a fetch failure, if any.
    pub fn response_status_code(&self) -> Option<u16> {
        match self {
            OracleError::FetchingData { status } | OracleError::ExchangeFetch { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Whether this is a user-facing validation error.
    pub fn is_validation(&self) -> bool {
        (1000..2000).contains(&self.code())
    }
}

fn exchange_name(exchange: &str, suffix: &str) -> &'static str {
    // `name` must hand out 'static strings, so the per-exchange identifiers
    // are spelled out for the embedded exchange set.
    match (exchange, suffix) {
        ("binance", "_FORMAT") => "INVALID_BINANCE_FORMAT",
        ("binance", "_PARSE_FAILED") => "BINANCE_PARSE_FAILED",
        ("binance", _) => "BINANCE_FETCH_FAILED",
        ("bybit", "_FORMAT") => "INVALID_BYBIT_FORMAT",
        ("bybit", "_PARSE_FAILED") => "BYBIT_PARSE_FAILED",
        ("bybit", _) => "BYBIT_FETCH_FAILED",
        ("coinbase", "_FORMAT") => "INVALID_COINBASE_FORMAT",
        ("coinbase", "_PARSE_FAILED") => "COINBASE_PARSE_FAILED",
        ("coinbase", _) => "COINBASE_FETCH_FAILED",
        ("crypto.com", "_FORMAT") => "INVALID_CRYPTO_COM_FORMAT",
        ("crypto.com", "_PARSE_FAILED") => "CRYPTO_COM_PARSE_FAILED",
        ("crypto.com", _) => "CRYPTO_COM_FETCH_FAILED",
        ("xt", "_FORMAT") => "INVALID_XT_FORMAT",
        ("xt", "_PARSE_FAILED") => "XT_PARSE_FAILED",
        ("xt", _) => "XT_FETCH_FAILED",
        ("gate.io", "_FORMAT") => "INVALID_GATE_IO_FORMAT",
        ("gate.io", "_PARSE_FAILED") => "GATE_IO_PARSE_FAILED",
        ("gate.io", _) => "GATE_IO_FETCH_FAILED",
        ("mexc", "_FORMAT") => "INVALID_MEXC_FORMAT",
        ("mexc", "_PARSE_FAILED") => "MEXC_PARSE_FAILED",
        ("mexc", _) => "MEXC_FETCH_FAILED",
        (_, "_FORMAT") => "INVALID_EXCHANGE_FORMAT",
        (_, "_PARSE_FAILED") => "EXCHANGE_PARSE_FAILED",
        _ => "EXCHANGE_FETCH_FAILED",
    }
}
