//! Ethereum addresses for secp256k1 keys, and `ecrecover` over combined
//! signatures.
use elliptic_curve::sec1::ToEncodedPoint;
use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    AffinePoint, PublicKey,
};
use sha3::{Digest, Keccak256};

use crate::{
    ecdsa::CombinedSignature,
    error::{decode_hex, CombineError, Result},
};

pub type Address = [u8; 20];

fn address_of(point: &AffinePoint) -> Address {
    let encoded = point.to_encoded_point(false);
    let hash = Keccak256::digest(&encoded.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

/// The address of a SEC1 encoded secp256k1 public key.
pub fn eth_address(public_key: &[u8]) -> Result<Address> {
    let public_key = PublicKey::from_sec1_bytes(public_key)
        .map_err(|e| CombineError::InvalidParamType(format!("invalid secp256k1 public key: {e}")))?;
    Ok(address_of(public_key.as_affine()))
}

/// EIP-55 mixed-case encoding of an address.
pub fn to_checksum(address: &Address) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Recover the address that produced `signature` over `message_hash`.
pub fn ecrecover(message_hash: &[u8], signature: &CombinedSignature) -> Result<Address> {
    let mut rs = decode_hex("r", &signature.r)?;
    rs.extend(decode_hex("s", &signature.s)?);
    let sig = Signature::from_slice(&rs)
        .map_err(|e| CombineError::InvalidParamType(format!("invalid signature: {e}")))?;
    let recovery_id = RecoveryId::from_byte(signature.recid).ok_or_else(|| {
        CombineError::InvalidParamType(format!("invalid recovery id {}", signature.recid))
    })?;
    let key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|e| CombineError::SignatureVerificationFailed(e.to_string()))?;
    Ok(address_of(key.as_affine()))
}
