use base64ct::{Base64, Encoding};

use crate::provider::ProviderError;

/// Stable classification of a [`CombineError`].
///
/// Callers that surface errors to users match on this rather than on the
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParamType,
    NoValidShares,
    InconsistentShares,
    UnsupportedCurve,
    UnsupportedOperation,
    SignatureVerificationFailed,
    NetworkError,
    AttestationFailed,
    UnknownError,
    Cache,
    Provider,
}

impl ErrorKind {
    /// The wire code for this kind, e.g. `NO_VALID_SHARES`.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidParamType => "INVALID_PARAM_TYPE",
            ErrorKind::NoValidShares => "NO_VALID_SHARES",
            ErrorKind::InconsistentShares => "INCONSISTENT_SHARES",
            ErrorKind::UnsupportedCurve => "UNSUPPORTED_CURVE",
            ErrorKind::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ErrorKind::SignatureVerificationFailed => "SIGNATURE_VERIFICATION_FAILED",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::AttestationFailed => "ATTESTATION_FAILED",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
            ErrorKind::Cache => "CACHE_ERROR",
            ErrorKind::Provider => "PROVIDER_ERROR",
        }
    }
}

/// Represents an error which can happen while combining shares or checking
/// an attestation.
#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    /// Some caller input was malformed.
    #[error("invalid parameter: {0}")]
    InvalidParamType(String),
    /// Nothing was left to combine after dropping empty shares.
    #[error("no valid shares to combine ({total} shares supplied)")]
    NoValidShares { total: usize },
    /// A share belongs to a different signing ceremony than the reference share.
    #[error("share {share_index} disagrees with the reference share on {field}")]
    InconsistentShares {
        share_index: u32,
        field: &'static str,
    },
    #[error("unsupported curve for signature type {0:?}")]
    UnsupportedCurve(String),
    #[error("{operation} is not supported for signature type {sig_type:?}")]
    UnsupportedOperation {
        sig_type: String,
        operation: &'static str,
    },
    /// Combination worked mechanically, but the result is not a valid signature.
    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),
    #[error("network error: {0}")]
    NetworkError(String),
    /// The arithmetic provider rejected the attestation report.
    #[error("attestation rejected: {0}")]
    AttestationFailed(String),
    #[error("unknown error: {0}")]
    UnknownError(String),
    #[error("certificate cache error: {0}")]
    Cache(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl CombineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CombineError::InvalidParamType(_) => ErrorKind::InvalidParamType,
            CombineError::NoValidShares { .. } => ErrorKind::NoValidShares,
            CombineError::InconsistentShares { .. } => ErrorKind::InconsistentShares,
            CombineError::UnsupportedCurve(_) => ErrorKind::UnsupportedCurve,
            CombineError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            CombineError::SignatureVerificationFailed(_) => {
                ErrorKind::SignatureVerificationFailed
            }
            CombineError::NetworkError(_) => ErrorKind::NetworkError,
            CombineError::AttestationFailed(_) => ErrorKind::AttestationFailed,
            CombineError::UnknownError(_) => ErrorKind::UnknownError,
            CombineError::Cache(_) => ErrorKind::Cache,
            CombineError::Provider(_) => ErrorKind::Provider,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

pub type Result<T> = std::result::Result<T, CombineError>;

/// Decode a hex string, accepting an optional `0x` prefix.
pub(crate) fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(strip_hex_prefix(value))
        .map_err(|e| CombineError::InvalidParamType(format!("{field} is not valid hex: {e}")))
}

/// Decode standard, padded base64.
pub(crate) fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>> {
    Base64::decode_vec(value.trim())
        .map_err(|e| CombineError::InvalidParamType(format!("{field} is not valid base64: {e}")))
}

pub(crate) fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}
