//! Field access for AMD SEV-SNP attestation reports, and the AMD Key
//! Distribution Service URL of the VCEK certificate that signed a report.
//!
//! Offsets follow the `ATTESTATION_REPORT` layout of the SEV-SNP firmware ABI.
use super::ProviderError;

pub const REPORT_SIZE: usize = 1184;

const REPORT_DATA_OFFSET: usize = 80;
const REPORT_DATA_SIZE: usize = 64;
const MEASUREMENT_OFFSET: usize = 144;
const MEASUREMENT_SIZE: usize = 48;
const REPORTED_TCB_OFFSET: usize = 384;
const REPORTED_TCB_SIZE: usize = 8;
const CHIP_ID_OFFSET: usize = 416;
const CHIP_ID_SIZE: usize = 64;

/// The processor family the signer nodes run on.
pub const DEFAULT_PRODUCT: &str = "Milan";

pub const KDS_VCEK_BASE: &str = "https://kdsintf.amd.com/vcek/v1";

/// Security patch levels of the reported TCB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcbVersion {
    pub bootloader: u8,
    pub tee: u8,
    pub snp: u8,
    pub microcode: u8,
}

fn field<'a>(report: &'a [u8], offset: usize, size: usize) -> Result<&'a [u8], ProviderError> {
    if report.len() < REPORT_SIZE {
        return Err(ProviderError::new(format!(
            "attestation report is {} bytes, expected {REPORT_SIZE}",
            report.len()
        )));
    }
    Ok(&report[offset..offset + size])
}

/// The 64 bytes of guest data bound into the report.
pub fn report_data(report: &[u8]) -> Result<&[u8], ProviderError> {
    field(report, REPORT_DATA_OFFSET, REPORT_DATA_SIZE)
}

/// The launch measurement of the guest.
pub fn measurement(report: &[u8]) -> Result<&[u8], ProviderError> {
    field(report, MEASUREMENT_OFFSET, MEASUREMENT_SIZE)
}

pub fn chip_id(report: &[u8]) -> Result<&[u8], ProviderError> {
    field(report, CHIP_ID_OFFSET, CHIP_ID_SIZE)
}

pub fn reported_tcb(report: &[u8]) -> Result<TcbVersion, ProviderError> {
    let tcb = field(report, REPORTED_TCB_OFFSET, REPORTED_TCB_SIZE)?;
    // bytes 2..6 are reserved
    Ok(TcbVersion {
        bootloader: tcb[0],
        tee: tcb[1],
        snp: tcb[6],
        microcode: tcb[7],
    })
}

/// Build the KDS URL for the VCEK of the chip and TCB named in `report`.
pub fn vcek_url(report: &[u8], product: &str) -> Result<String, ProviderError> {
    let chip_id = hex::encode(chip_id(report)?);
    let tcb = reported_tcb(report)?;
    Ok(format!(
        "{KDS_VCEK_BASE}/{product}/{chip_id}?blSPL={:02}&teeSPL={:02}&snpSPL={:02}&ucodeSPL={:02}",
        tcb.bootloader, tcb.tee, tcb.snp, tcb.microcode
    ))
}
