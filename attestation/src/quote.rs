//! Quote generation and Open Enclave evidence framing.

use oracle_shared::{OracleError, Result};

use crate::device::{AttestationDevice, QUOTE, USER_REPORT_DATA, enclave_lock};

/// Size of the user data field an SGX quote binds to.
pub const REPORT_DATA_SIZE: usize = 64;

/// Floor below which a returned quote cannot contain a header and body.
pub const QUOTE_MIN_SIZE: usize = 1024;

const EVIDENCE_VERSION: u32 = 1;
const EVIDENCE_TYPE_SGX_ECDSA: u32 = 2;

/// Ask the quoting enclave for a quote binding `input`.
///
/// `input` is zero-padded to the 64-byte report data field. The write of
/// the report data and the read of the quote form one critical section:
/// the quoting enclave signs whatever was written last.
pub fn generate_quote(device: &AttestationDevice, input: &[u8]) -> Result<Vec<u8>> {
    if input.len() > REPORT_DATA_SIZE {
        return Err(OracleError::InvalidSgxReportData(REPORT_DATA_SIZE));
    }
    let mut report_data = [0u8; REPORT_DATA_SIZE];
    report_data[..input.len()].copy_from_slice(input);

    let quote = {
        let _guard = enclave_lock();
        device.write_file(USER_REPORT_DATA, &report_data)?;
        device.read_file(QUOTE)?
    };

    if quote.len() < QUOTE_MIN_SIZE {
        return Err(OracleError::QuoteTooSmall);
    }
    Ok(wrap_evidence(&quote))
}

/// Frame a raw SGX quote as Open Enclave evidence:
/// `[u32 LE version][u32 LE type][u64 LE quote length][quote]`.
pub fn wrap_evidence(quote: &[u8]) -> Vec<u8> {
    let mut evidence = Vec::with_capacity(16 + quote.len());
    evidence.extend_from_slice(&EVIDENCE_VERSION.to_le_bytes());
    evidence.extend_from_slice(&EVIDENCE_TYPE_SGX_ECDSA.to_le_bytes());
    evidence.extend_from_slice(&(quote.len() as u64).to_le_bytes());
    evidence.extend_from_slice(quote);
    evidence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_framing_is_fixed() {
        let quote = vec![0xabu8; 1100];
        let evidence = wrap_evidence(&quote);
        assert_eq!(&evidence[..8], &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(&evidence[8..16], &1100u64.to_le_bytes());
        assert_eq!(&evidence[16..], &quote[..]);
    }

    #[test]
    fn quote_generation_binds_the_padded_input() {
        let dir = tempfile::tempdir().unwrap();
        let device = AttestationDevice::new(dir.path());
        std::fs::write(dir.path().join(USER_REPORT_DATA), b"").unwrap();
        std::fs::write(dir.path().join(QUOTE), vec![0x11u8; QUOTE_MIN_SIZE]).unwrap();

        let evidence = generate_quote(&device, &[9u8; 32]).unwrap();
        assert_eq!(&evidence[..8], &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(
            &evidence[8..16],
            &(QUOTE_MIN_SIZE as u64).to_le_bytes()
        );

        let mut expected = [0u8; REPORT_DATA_SIZE];
        expected[..32].copy_from_slice(&[9u8; 32]);
        assert_eq!(
            std::fs::read(dir.path().join(USER_REPORT_DATA)).unwrap(),
            expected
        );
    }

    #[test]
    fn oversized_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let device = AttestationDevice::new(dir.path());
        assert!(matches!(
            generate_quote(&device, &[0u8; REPORT_DATA_SIZE + 1]),
            Err(OracleError::InvalidSgxReportData(_))
        ));
    }

    #[test]
    fn undersized_quotes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let device = AttestationDevice::new(dir.path());
        std::fs::write(dir.path().join(USER_REPORT_DATA), b"").unwrap();
        std::fs::write(dir.path().join(QUOTE), vec![0u8; QUOTE_MIN_SIZE - 1]).unwrap();
        assert!(matches!(
            generate_quote(&device, &[1u8; 16]),
            Err(OracleError::QuoteTooSmall)
        ));
    }
}
