//! The arithmetic provider seams.
//!
//! Everything in this crate above these traits is orchestration: share
//! validation, variant dispatch, normalization, and sequencing. The curve,
//! pairing and attestation math happens behind them, so a different backend
//! can be substituted as long as it honors the same contracts.
use std::collections::BTreeMap;

use crate::curve::{BlsVariant, EcdsaVariant};

#[cfg(feature = "blsful")]
pub mod blsful;
pub mod native;
pub mod sev_snp;

/// An error reported by an arithmetic provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A combined ECDSA signature as produced by the provider, before normalization.
///
/// `r` and `s` are big-endian scalars, `recovery_id` is the parity of the
/// nonce point's y coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEcdsaSignature {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
    pub recovery_id: u8,
}

pub trait EcdsaArithmetic {
    /// Combine signature shares made against the nonce commitment `big_r`.
    fn ecdsa_combine(
        &self,
        variant: EcdsaVariant,
        big_r: &[u8],
        shares: &[Vec<u8>],
    ) -> Result<RawEcdsaSignature, ProviderError>;

    /// Check a signature against a message hash and a SEC1 public key.
    fn ecdsa_verify(
        &self,
        variant: EcdsaVariant,
        message_hash: &[u8],
        public_key: &[u8],
        signature: &RawEcdsaSignature,
    ) -> Result<(), ProviderError>;

    /// Derive a child public key from node public key shares and a key id.
    fn ecdsa_derive_key(
        &self,
        variant: EcdsaVariant,
        key_id: &[u8],
        public_keys: &[Vec<u8>],
    ) -> Result<Vec<u8>, ProviderError>;
}

pub trait BlsArithmetic {
    fn bls_encrypt(
        &self,
        variant: BlsVariant,
        public_key: &[u8],
        message: &[u8],
        identity: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;

    /// Decrypt an identity-encrypted ciphertext, using a group signature as the key.
    fn bls_decrypt(
        &self,
        variant: BlsVariant,
        ciphertext: &[u8],
        signature: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;

    /// Combine JSON-serialized signature shares into a group signature.
    fn bls_combine(
        &self,
        variant: BlsVariant,
        shares: &[String],
    ) -> Result<Vec<u8>, ProviderError>;

    fn bls_verify(
        &self,
        variant: BlsVariant,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), ProviderError>;
}

pub trait SevSnpArithmetic {
    /// The AMD KDS URL of the VCEK certificate that signed `report`.
    ///
    /// The default reads the chip id and reported TCB out of the report and
    /// builds the Milan URL.
    fn vcek_url(&self, report: &[u8]) -> Result<String, ProviderError> {
        sev_snp::vcek_url(report, sev_snp::DEFAULT_PRODUCT)
    }

    /// Verify the report signature and that the report binds `challenge`,
    /// `data` and `signatures`.
    fn verify(
        &self,
        report: &[u8],
        data: &BTreeMap<String, Vec<u8>>,
        signatures: &[Vec<u8>],
        challenge: &[u8],
        vcek_certificate: &[u8],
    ) -> Result<(), ProviderError>;
}

impl<T: EcdsaArithmetic + ?Sized> EcdsaArithmetic for &T {
    fn ecdsa_combine(
        &self,
        variant: EcdsaVariant,
        big_r: &[u8],
        shares: &[Vec<u8>],
    ) -> Result<RawEcdsaSignature, ProviderError> {
        (**self).ecdsa_combine(variant, big_r, shares)
    }

    fn ecdsa_verify(
        &self,
        variant: EcdsaVariant,
        message_hash: &[u8],
        public_key: &[u8],
        signature: &RawEcdsaSignature,
    ) -> Result<(), ProviderError> {
        (**self).ecdsa_verify(variant, message_hash, public_key, signature)
    }

    fn ecdsa_derive_key(
        &self,
        variant: EcdsaVariant,
        key_id: &[u8],
        public_keys: &[Vec<u8>],
    ) -> Result<Vec<u8>, ProviderError> {
        (**self).ecdsa_derive_key(variant, key_id, public_keys)
    }
}

impl<T: BlsArithmetic + ?Sized> BlsArithmetic for &T {
    fn bls_encrypt(
        &self,
        variant: BlsVariant,
        public_key: &[u8],
        message: &[u8],
        identity: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        (**self).bls_encrypt(variant, public_key, message, identity)
    }

    fn bls_decrypt(
        &self,
        variant: BlsVariant,
        ciphertext: &[u8],
        signature: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        (**self).bls_decrypt(variant, ciphertext, signature)
    }

    fn bls_combine(
        &self,
        variant: BlsVariant,
        shares: &[String],
    ) -> Result<Vec<u8>, ProviderError> {
        (**self).bls_combine(variant, shares)
    }

    fn bls_verify(
        &self,
        variant: BlsVariant,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), ProviderError> {
        (**self).bls_verify(variant, public_key, message, signature)
    }
}

impl<T: SevSnpArithmetic + ?Sized> SevSnpArithmetic for &T {
    fn vcek_url(&self, report: &[u8]) -> Result<String, ProviderError> {
        (**self).vcek_url(report)
    }

    fn verify(
        &self,
        report: &[u8],
        data: &BTreeMap<String, Vec<u8>>,
        signatures: &[Vec<u8>],
        challenge: &[u8],
        vcek_certificate: &[u8],
    ) -> Result<(), ProviderError> {
        (**self).verify(report, data, signatures, challenge, vcek_certificate)
    }
}
