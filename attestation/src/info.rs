//! The enclave's own measurements, read once and memoized.

use once_cell::sync::OnceCell;
use serde::Serialize;

use oracle_shared::Result;

use crate::device::AttestationDevice;
use crate::report::{SgxReportBody, aleo_measurement, aleo_product_id, generate_report};

static SGX_INFO: OnceCell<SgxInfo> = OnceCell::new();

/// Identity of the running enclave, in both raw and program-text form.
#[derive(Debug, Clone, Serialize)]
pub struct SgxInfo {
    pub mr_enclave: String,
    pub mr_signer: String,
    pub aleo_mr_enclave: String,
    pub aleo_mr_signer: String,
    pub aleo_product_id: String,
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    pub debug: bool,
}

impl SgxInfo {
    /// Assemble the measurement view from a raw report.
    pub fn from_report_bytes(report: &[u8]) -> Result<Self> {
        let body = SgxReportBody::parse_from(report)?;
        Ok(Self {
            mr_enclave: hex::encode(body.mr_enclave),
            mr_signer: hex::encode(body.mr_signer),
            aleo_mr_enclave: aleo_measurement(&body.mr_enclave),
            aleo_mr_signer: aleo_measurement(&body.mr_signer),
            aleo_product_id: aleo_product_id(body.isv_prod_id),
            isv_prod_id: body.isv_prod_id,
            isv_svn: body.isv_svn,
            debug: body.debug(),
        })
    }
}

/// The process-wide measurement info.
///
/// The first caller pays for a report generation round trip; later callers
/// get the cached value without touching the pseudo-files.
pub fn sgx_info(device: &AttestationDevice) -> Result<&'static SgxInfo> {
    SGX_INFO.get_or_try_init(|| {
        let report = generate_report(device)?;
        let info = SgxInfo::from_report_bytes(&report)?;
        tracing::info!(
            mr_enclave = %info.mr_enclave,
            mr_signer = %info.mr_signer,
            debug = info.debug,
            "loaded enclave measurements"
        );
        Ok(info)
    })
}
