//! Local report generation and parsing of the SGX report body.

use oracle_shared::{OracleError, Result};

use oracle_session::chunk::digest_chunks;

use crate::device::{
    AttestationDevice, MY_TARGET_INFO, REPORT, TARGET_INFO, USER_REPORT_DATA, enclave_lock,
};
use crate::quote::REPORT_DATA_SIZE;

/// Size of the fixed REPORTBODY layout.
pub const SGX_REPORT_BODY_SIZE: usize = 384;

/// Produce a local report targeted at our own enclave.
///
/// Used once at startup to learn the enclave's measurements. The target
/// info round trip and the report read are stateful, so the whole sequence
/// holds the enclave lock.
pub fn generate_report(device: &AttestationDevice) -> Result<Vec<u8>> {
    let _guard = enclave_lock();
    let target_info = device.read_file(MY_TARGET_INFO)?;
    device.write_file(TARGET_INFO, &target_info)?;
    device.write_file(USER_REPORT_DATA, &[0u8; REPORT_DATA_SIZE])?;
    device.read_file(REPORT)
}

/// The measurement fields of an SGX report body.
///
/// Layout per the SGX programming reference: CPUSVN, MISCSELECT, reserved,
/// ATTRIBUTES{FLAGS, XFRM}, MRENCLAVE, reserved, MRSIGNER, reserved,
/// ISVPRODID, ISVSVN, reserved, REPORTDATA.
pub struct SgxReportBody {
    pub cpu_svn: [u8; 16],
    pub misc_select: u32,
    pub attributes: [u8; 16],
    pub mr_enclave: [u8; 32],
    pub mr_signer: [u8; 32],
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    pub report_data: [u8; 64],
}

impl SgxReportBody {
    /// Parse the leading report body out of `bytes`.
    ///
    /// Gramine's `report` pseudo-file returns the full REPORT structure;
    /// the key-material tail after the 384-byte body is ignored.
    pub fn parse_from(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SGX_REPORT_BODY_SIZE {
            return Err(OracleError::ReadingReport);
        }
        let mut pos: usize = 0;
        let mut take = |n: usize| -> &[u8] {
            let ret = &bytes[pos..pos + n];
            pos += n;
            ret
        };

        // Parse by offsets; no transmuting, to keep endianness explicit.
        // off 0, size 16
        let cpu_svn = <[u8; 16]>::try_from(take(16)).map_err(|_| OracleError::ReadingReport)?;

        // off 16, size 4
        let misc_select = u32::from_le_bytes(
            <[u8; 4]>::try_from(take(4)).map_err(|_| OracleError::ReadingReport)?,
        );

        // off 20, size 28
        let _reserved = take(28);

        // off 48, size 16 (FLAGS 8 + XFRM 8)
        let attributes = <[u8; 16]>::try_from(take(16)).map_err(|_| OracleError::ReadingReport)?;

        // off 64, size 32
        let mr_enclave = <[u8; 32]>::try_from(take(32)).map_err(|_| OracleError::ReadingReport)?;

        // off 96, size 32
        let _reserved = take(32);

        // off 128, size 32
        let mr_signer = <[u8; 32]>::try_from(take(32)).map_err(|_| OracleError::ReadingReport)?;

        // off 160, size 96
        let _reserved = take(96);

        // off 256, size 2
        let isv_prod_id = u16::from_le_bytes(
            <[u8; 2]>::try_from(take(2)).map_err(|_| OracleError::ReadingReport)?,
        );

        // off 258, size 2
        let isv_svn = u16::from_le_bytes(
            <[u8; 2]>::try_from(take(2)).map_err(|_| OracleError::ReadingReport)?,
        );

        // off 260, size 60
        let _reserved = take(60);

        // off 320, size 64
        let report_data = <[u8; 64]>::try_from(take(64)).map_err(|_| OracleError::ReadingReport)?;

        Ok(Self {
            cpu_svn,
            misc_select,
            attributes,
            mr_enclave,
            mr_signer,
            isv_prod_id,
            isv_svn,
            report_data,
        })
    }

    /// Whether the enclave runs with the debug attribute set (bit 1 of the
    /// first FLAGS byte).
    pub fn debug(&self) -> bool {
        self.attributes[0] & 0x02 != 0
    }
}

/// A 32-byte measurement as the two-chunk struct text downstream programs
/// consume: each half byte-reversed and read as a big-endian `u128`.
pub fn aleo_measurement(hash: &[u8; 32]) -> String {
    let (chunk_1, chunk_2) = digest_chunks(hash);
    format!("{{ chunk_1: {chunk_1}u128, chunk_2: {chunk_2}u128 }}")
}

/// An ISV product id as program text, widened from its LE `u16`.
pub fn aleo_product_id(id: u16) -> String {
    format!("{}u128", u128::from(id))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn report_with(
        mr_enclave: [u8; 32],
        mr_signer: [u8; 32],
        flags: u8,
        isv_prod_id: u16,
        isv_svn: u16,
    ) -> Vec<u8> {
        let mut report = vec![0u8; 432];
        report[48] = flags;
        report[64..96].copy_from_slice(&mr_enclave);
        report[128..160].copy_from_slice(&mr_signer);
        report[256..258].copy_from_slice(&isv_prod_id.to_le_bytes());
        report[258..260].copy_from_slice(&isv_svn.to_le_bytes());
        report
    }

    #[test]
    fn fields_parse_from_their_offsets() {
        let report = report_with([3u8; 32], [4u8; 32], 0x05, 7, 2);
        let body = SgxReportBody::parse_from(&report).unwrap();
        assert_eq!(body.mr_enclave, [3u8; 32]);
        assert_eq!(body.mr_signer, [4u8; 32]);
        assert_eq!(body.isv_prod_id, 7);
        assert_eq!(body.isv_svn, 2);
        assert_eq!(body.attributes[0], 0x05);
        assert!(!body.debug());
    }

    #[test]
    fn debug_bit_is_bit_one_of_the_first_flags_byte() {
        let debug = SgxReportBody::parse_from(&report_with([0; 32], [0; 32], 0x02, 0, 0)).unwrap();
        assert!(debug.debug());
        let release =
            SgxReportBody::parse_from(&report_with([0; 32], [0; 32], 0x01, 0, 0)).unwrap();
        assert!(!release.debug());
    }

    #[test]
    fn short_reports_are_rejected() {
        assert!(matches!(
            SgxReportBody::parse_from(&[0u8; SGX_REPORT_BODY_SIZE - 1]),
            Err(OracleError::ReadingReport)
        ));
    }

    #[test]
    fn measurements_stringify_as_two_le_chunks() {
        let mut hash = [0u8; 32];
        hash[0] = 1;
        hash[16] = 2;
        assert_eq!(
            aleo_measurement(&hash),
            "{ chunk_1: 1u128, chunk_2: 2u128 }"
        );
        assert_eq!(aleo_product_id(5), "5u128");
    }

    #[test]
    fn report_generation_round_trips_the_target_info() {
        let dir = tempfile::tempdir().unwrap();
        let device = AttestationDevice::new(dir.path());
        std::fs::write(dir.path().join(MY_TARGET_INFO), b"target info").unwrap();
        std::fs::write(dir.path().join(TARGET_INFO), b"").unwrap();
        std::fs::write(dir.path().join(USER_REPORT_DATA), b"").unwrap();
        std::fs::write(dir.path().join(REPORT), report_with([1; 32], [2; 32], 0, 0, 0)).unwrap();

        let report = generate_report(&device).unwrap();
        assert_eq!(report.len(), 432);
        assert_eq!(
            std::fs::read(dir.path().join(TARGET_INFO)).unwrap(),
            b"target info"
        );
        assert_eq!(
            std::fs::read(dir.path().join(USER_REPORT_DATA)).unwrap(),
            vec![0u8; 64]
        );
    }
}
