//! Positional metadata for the canonical request encoding.
//!
//! Positions and lengths are expressed in 16-byte blocks. The meta-header
//! occupies blocks 0 and 1, so recorded field positions start at block 2.
//! The field ordering of [`ProofPositionalInfo`] is part of the wire format
//! consumed by downstream verifiers.

use serde::{Deserialize, Serialize};

/// Block position and length of one encoded field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub pos: u16,
    pub len: u16,
}

impl PositionInfo {
    pub fn new(pos: u16, len: u16) -> Self {
        Self { pos, len }
    }
}

/// Positions of every field of the encoded request, in verifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPositionalInfo {
    pub data: PositionInfo,
    pub timestamp: PositionInfo,
    pub status_code: PositionInfo,
    pub url: PositionInfo,
    pub selector: PositionInfo,
    pub encoding_options: PositionInfo,
    pub method: PositionInfo,
    pub response_format: PositionInfo,
    pub request_headers: PositionInfo,
    pub optional_fields: PositionInfo,
}
