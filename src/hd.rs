//! Hierarchically deterministic public keys.
//!
//! A PKP's child key for a key id is a polynomial in the hashed key id whose
//! coefficients are the node public key shares. Anyone holding the shares can
//! recompute it, no private material is involved.
use tracing::debug;

use crate::{
    curve::{self, CurveVariant},
    error::{decode_hex, CombineError, Result},
    provider::EcdsaArithmetic,
};

const OPERATION: &str = "HD key derivation";

/// Derive the child public key for `key_id` from the node public keys.
///
/// `pubkeys` and `key_id` are hex, optionally `0x` prefixed. The result is an
/// uncompressed SEC1 key in hex, without prefix.
pub fn compute_hd_pub_key<P, K>(
    provider: &P,
    pubkeys: &[K],
    key_id: &str,
    sig_type: &str,
) -> Result<String>
where
    P: EcdsaArithmetic + ?Sized,
    K: AsRef<str>,
{
    let unsupported = || CombineError::UnsupportedOperation {
        sig_type: sig_type.to_string(),
        operation: OPERATION,
    };
    let variant = match curve::resolve(sig_type) {
        Ok(CurveVariant::Ecdsa(v)) => v,
        _ => return Err(unsupported()),
    };
    if pubkeys.is_empty() {
        return Err(CombineError::InvalidParamType(
            "at least one public key is required".to_string(),
        ));
    }

    let key_id = decode_hex("keyId", key_id)?;
    let public_keys = pubkeys
        .iter()
        .map(|k| decode_hex("pubkeys", k.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    debug!(?variant, keys = public_keys.len(), "deriving HD public key");

    let derived = provider
        .ecdsa_derive_key(variant, &key_id, &public_keys)
        .map_err(|e| CombineError::InvalidParamType(e.to_string()))?;
    Ok(hex::encode(derived))
}

/// The Ethereum address of the derived secp256k1 key, EIP-55 encoded.
#[cfg(feature = "k256")]
pub fn hd_pub_key_address<P, K>(provider: &P, pubkeys: &[K], key_id: &str) -> Result<String>
where
    P: EcdsaArithmetic + ?Sized,
    K: AsRef<str>,
{
    let public_key = compute_hd_pub_key(provider, pubkeys, key_id, "K256")?;
    let bytes = decode_hex("publicKey", &public_key)?;
    Ok(crate::address::to_checksum(&crate::address::eth_address(
        &bytes,
    )?))
}

#[cfg(all(test, feature = "k256"))]
mod test {
    use k256::{ProjectivePoint, Scalar, Secp256k1};

    use super::*;
    use crate::{
        compat::EcdsaCurve, error::ErrorKind, provider::native::NativeEcdsa, test::CountingEcdsa,
    };

    fn node_keys() -> Vec<String> {
        (1..=3u64)
            .map(|i| {
                let point = ProjectivePoint::GENERATOR * Scalar::from(i * 1000 + 7);
                hex::encode(Secp256k1::encode_point(&point.to_affine(), true))
            })
            .collect()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let keys = node_keys();
        let key_id = hex::encode(b"lit_action_QmFoo");
        let a = compute_hd_pub_key(&NativeEcdsa, &keys, &key_id, "K256").unwrap();
        let b = compute_hd_pub_key(&NativeEcdsa, &keys, &key_id, "ECDSA_CAIT_SITH").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 130);
        assert!(a.starts_with("04"));

        let other = compute_hd_pub_key(&NativeEcdsa, &keys, "abcd", "K256").unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_prefixes_are_ignored() {
        let keys = node_keys();
        let prefixed: Vec<String> = keys.iter().map(|k| format!("0x{k}")).collect();
        let a = compute_hd_pub_key(&NativeEcdsa, &keys, "beef", "K256").unwrap();
        let b = compute_hd_pub_key(&NativeEcdsa, &prefixed, "0xbeef", "K256").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_ecdsa_is_unsupported() {
        let provider = CountingEcdsa::default();
        let keys = node_keys();
        for sig_type in ["BLS", "Bls12381", "SchnorrEd25519", ""] {
            let err = compute_hd_pub_key(&provider, &keys, "beef", sig_type).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        }
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_empty_key_set() {
        let keys: Vec<String> = Vec::new();
        let err = compute_hd_pub_key(&NativeEcdsa, &keys, "beef", "K256").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParamType);
    }

    #[test]
    fn test_malformed_key_is_a_parameter_error() {
        let mut keys = node_keys();
        keys[1] = format!("05{}", &keys[1][2..]);
        let err = compute_hd_pub_key(&NativeEcdsa, &keys, "beef", "K256").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParamType);
        assert!(err.to_string().contains("public key 1"));
    }

    #[cfg(feature = "p256")]
    #[test]
    fn test_p256_derivation() {
        let keys: Vec<String> = (1..=2u64)
            .map(|i| {
                let point = p256::ProjectivePoint::GENERATOR * p256::Scalar::from(i + 40);
                hex::encode(p256::NistP256::encode_point(&point.to_affine(), false))
            })
            .collect();
        let k1 = compute_hd_pub_key(&NativeEcdsa, &keys, "beef", "EcdsaCaitSithP256").unwrap();
        let k2 = compute_hd_pub_key(&NativeEcdsa, &keys, "beef", "K256");
        assert_eq!(k1.len(), 130);
        // P-256 points are not secp256k1 points
        assert_eq!(k2.unwrap_err().kind(), ErrorKind::InvalidParamType);
    }

    #[test]
    fn test_address_of_derived_key() {
        let keys = node_keys();
        let address = hd_pub_key_address(&NativeEcdsa, &keys, "beef").unwrap();
        assert_eq!(address.len(), 42);
        assert!(address.starts_with("0x"));
    }
}
