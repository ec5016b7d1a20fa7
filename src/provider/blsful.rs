//! A BLS arithmetic provider backed by `blsful`.
use ::blsful::{
    inner_types::{G1Projective, G2Projective, GroupEncoding},
    Bls12381G2Impl, PublicKey, Signature, SignatureSchemes, SignatureShare, TimeCryptCiphertext,
};

use super::{BlsArithmetic, ProviderError};
use crate::{bls::BlsSignatureShare, curve::BlsVariant, error::strip_hex_prefix};

/// Proof-of-possession signatures in G2 with public keys in G1.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlsfulProvider;

fn decode_group<G: GroupEncoding>(what: &str, bytes: &[u8]) -> Result<G, ProviderError> {
    let mut repr = G::Repr::default();
    if repr.as_ref().len() != bytes.len() {
        return Err(ProviderError::new(format!(
            "{what} must be {} bytes, got {}",
            repr.as_ref().len(),
            bytes.len()
        )));
    }
    repr.as_mut().copy_from_slice(bytes);
    Option::from(G::from_bytes(&repr)).ok_or_else(|| ProviderError::new(format!("invalid {what}")))
}

fn public_key(bytes: &[u8]) -> Result<PublicKey<Bls12381G2Impl>, ProviderError> {
    Ok(PublicKey(decode_group::<G1Projective>("public key", bytes)?))
}

fn signature(bytes: &[u8]) -> Result<Signature<Bls12381G2Impl>, ProviderError> {
    Ok(Signature::ProofOfPossession(decode_group::<G2Projective>(
        "signature",
        bytes,
    )?))
}

/// Reduce a node share identifier to blsful's one byte identifier.
///
/// Nodes send the identifier as a hex scalar, which may be a single byte or
/// a wider big or little endian integer, as long as its value fits in a byte.
fn share_identifier(identifier: &str) -> Result<u8, ProviderError> {
    let bytes = hex::decode(strip_hex_prefix(identifier))
        .map_err(|e| ProviderError::new(format!("invalid share identifier: {e}")))?;
    let fits = |rest: &[u8]| rest.iter().all(|b| *b == 0);
    match bytes.as_slice() {
        [] => Err(ProviderError::new("empty share identifier")),
        [.., last] if fits(&bytes[..bytes.len() - 1]) => Ok(*last),
        [first, rest @ ..] if fits(rest) => Ok(*first),
        _ => Err(ProviderError::new(format!(
            "share identifier {identifier} does not fit in a byte"
        ))),
    }
}

/// Parse one share, either in blsful's own JSON form or in the
/// `{"ProofOfPossession":{"identifier","value"}}` form signer nodes send.
fn parse_share(json: &str) -> Result<SignatureShare<Bls12381G2Impl>, ProviderError> {
    if let Ok(share) = serde_json::from_str::<SignatureShare<Bls12381G2Impl>>(json) {
        return Ok(share);
    }
    let share: BlsSignatureShare = serde_json::from_str(json)
        .map_err(|e| ProviderError::new(format!("failed to parse BLS share: {e}")))?;
    let pop = share.proof_of_possession;
    let identifier = share_identifier(&pop.identifier)?;
    let inner = format!("{identifier:02x}{}", strip_hex_prefix(&pop.value));
    serde_json::from_value(serde_json::json!({ "ProofOfPossession": inner }))
        .map_err(|e| ProviderError::new(format!("failed to parse BLS share: {e}")))
}

impl BlsArithmetic for BlsfulProvider {
    fn bls_encrypt(
        &self,
        variant: BlsVariant,
        public_key_bytes: &[u8],
        message: &[u8],
        identity: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let BlsVariant::Bls12381G2 = variant;
        let ciphertext = public_key(public_key_bytes)?
            .encrypt_time_lock(SignatureSchemes::ProofOfPossession, message, identity)
            .map_err(|e| ProviderError::new(format!("encryption failed: {e}")))?;
        serde_bare::to_vec(&ciphertext).map_err(|e| ProviderError::new(e.to_string()))
    }

    fn bls_decrypt(
        &self,
        variant: BlsVariant,
        ciphertext: &[u8],
        signature_bytes: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let BlsVariant::Bls12381G2 = variant;
        let ciphertext = serde_bare::from_slice::<TimeCryptCiphertext<Bls12381G2Impl>>(ciphertext)
            .map_err(|e| ProviderError::new(format!("invalid ciphertext: {e}")))?;
        Option::<Vec<u8>>::from(ciphertext.decrypt(&signature(signature_bytes)?))
            .ok_or_else(|| ProviderError::new("decryption failed"))
    }

    fn bls_combine(
        &self,
        variant: BlsVariant,
        shares: &[String],
    ) -> Result<Vec<u8>, ProviderError> {
        let BlsVariant::Bls12381G2 = variant;
        let shares = shares
            .iter()
            .map(|s| parse_share(s))
            .collect::<Result<Vec<_>, _>>()?;
        let signature = Signature::from_shares(&shares)
            .map_err(|e| ProviderError::new(format!("failed to combine BLS shares: {e}")))?;
        Ok(signature.as_raw_value().to_bytes().as_ref().to_vec())
    }

    fn bls_verify(
        &self,
        variant: BlsVariant,
        public_key_bytes: &[u8],
        message: &[u8],
        signature_bytes: &[u8],
    ) -> Result<(), ProviderError> {
        let BlsVariant::Bls12381G2 = variant;
        signature(signature_bytes)?
            .verify(&public_key(public_key_bytes)?, message)
            .map_err(|e| ProviderError::new(format!("signature verification failed: {e}")))
    }
}
