//! SGX attestation plumbing for enclaves running under Gramine.
//!
//! Gramine exposes attestation operations as pseudo-files under
//! `/dev/attestation`; writing user report data and reading the `quote`
//! file drives the quoting enclave. Everything here goes through a
//! confined open that refuses to leave the attestation root.

pub mod device;
pub mod info;
pub mod quote;
pub mod report;

pub use device::AttestationDevice;
pub use info::{SgxInfo, sgx_info};
pub use quote::{QUOTE_MIN_SIZE, REPORT_DATA_SIZE, generate_quote, wrap_evidence};
pub use report::{SGX_REPORT_BODY_SIZE, SgxReportBody, generate_report};
