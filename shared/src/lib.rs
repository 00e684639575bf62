//! Types, constants and error codes shared between the oracle components.

pub mod error;
pub mod positions;
pub mod request;
pub mod response;

pub use error::{OracleError, Result};
pub use positions::{PositionInfo, ProofPositionalInfo};
pub use request::{
    AttestationRequest, EncodingOptions, EncodingValue, HtmlResultType, PriceFeedSymbol,
    RequestMethod, ResponseFormat,
};
pub use response::{NotarizationResponse, OracleData};

/// Size of one encoded block. Every field of the canonical encoding is
/// padded to a multiple of this.
pub const TARGET_ALIGNMENT: usize = 16;

/// Upper bound on the attestation data carried inside the encoded request.
pub const ATTESTATION_DATA_SIZE_LIMIT: usize = 3072;

/// Maximum number of decimal digits a float encoding may request.
pub const FLOAT_MAX_PRECISION: u8 = 12;

/// Reserved URL prefix selecting the internal price feed aggregator
/// instead of an external endpoint.
pub const PRICE_FEED_PREFIX: &str = "price_feed:";
