//! An ECDSA arithmetic provider over the RustCrypto curves.
use elliptic_curve::{point::AffineCoordinates, Field, Group};

use super::{EcdsaArithmetic, ProviderError, RawEcdsaSignature};
use crate::{
    compat::{self, EcdsaCurve},
    curve::EcdsaVariant,
};

/// Combines, verifies and derives keys in-process, with no secret material.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEcdsa;

fn combine<C: EcdsaCurve>(
    big_r: &[u8],
    shares: &[Vec<u8>],
) -> Result<RawEcdsaSignature, ProviderError> {
    if shares.is_empty() {
        return Err(ProviderError::new("no shares provided"));
    }
    let big_r =
        C::decode_point(big_r).ok_or_else(|| ProviderError::new("cannot deserialize bigR"))?;
    if bool::from(big_r.is_identity()) {
        return Err(ProviderError::new("bigR is the identity"));
    }

    let mut s = C::Scalar::ZERO;
    for (i, share) in shares.iter().enumerate() {
        let s_i = compat::scalar_from_bytes::<C>(share)
            .ok_or_else(|| ProviderError::new(format!("cannot deserialize share {i}")))?;
        s += s_i;
    }

    let big_r: C::AffinePoint = big_r.into();
    let r = compat::x_coordinate::<C>(&big_r);
    if bool::from(r.is_zero() | s.is_zero()) {
        return Err(ProviderError::new("combined signature has a zero component"));
    }

    Ok(RawEcdsaSignature {
        r: compat::scalar_to_bytes::<C>(&r),
        s: compat::scalar_to_bytes::<C>(&s),
        recovery_id: u8::from(bool::from(big_r.y_is_odd())),
    })
}

fn verify<C: EcdsaCurve>(
    message_hash: &[u8],
    public_key: &[u8],
    signature: &RawEcdsaSignature,
) -> Result<(), ProviderError> {
    let z = compat::scalar_from_digest::<C>(message_hash)
        .ok_or_else(|| ProviderError::new("invalid message digest length"))?;
    if bool::from(z.is_zero()) {
        return Err(ProviderError::new("invalid message digest"));
    }
    let public_key = C::decode_point(public_key)
        .ok_or_else(|| ProviderError::new("cannot deserialize public key"))?;
    let r = compat::scalar_from_bytes::<C>(&signature.r)
        .ok_or_else(|| ProviderError::new("cannot deserialize r"))?;
    let s = compat::scalar_from_bytes::<C>(&signature.s)
        .ok_or_else(|| ProviderError::new("cannot deserialize s"))?;
    if bool::from(r.is_zero()) {
        return Err(ProviderError::new("invalid signature"));
    }
    // This will fail if s == 0
    let s_inv = Option::<C::Scalar>::from(s.invert())
        .ok_or_else(|| ProviderError::new("invalid signature"))?;

    let reproduced =
        (C::ProjectivePoint::generator() * (z * s_inv)) + (public_key * (r * s_inv));
    let reproduced: C::AffinePoint = reproduced.into();
    if compat::x_coordinate::<C>(&reproduced) != r {
        return Err(ProviderError::new("invalid signature"));
    }
    Ok(())
}

/// `Σ public_keys[i] · d^i` where `d` is the key id hashed to a scalar.
fn derive_key<C: EcdsaCurve>(
    key_id: &[u8],
    public_keys: &[Vec<u8>],
) -> Result<Vec<u8>, ProviderError> {
    if public_keys.is_empty() {
        return Err(ProviderError::new("no public keys provided"));
    }
    let d = C::hd_scalar(key_id).ok_or_else(|| ProviderError::new("cannot hash key id"))?;
    let points = public_keys
        .iter()
        .enumerate()
        .map(|(i, k)| {
            C::decode_point(k)
                .ok_or_else(|| ProviderError::new(format!("cannot deserialize public key {i}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let derived = points
        .iter()
        .rev()
        .fold(C::ProjectivePoint::identity(), |acc, p| acc * d + *p);
    if bool::from(derived.is_identity()) {
        return Err(ProviderError::new("derived key is the identity"));
    }
    Ok(C::encode_point(&derived.into(), false))
}

fn not_compiled_in(variant: EcdsaVariant) -> ProviderError {
    ProviderError::new(format!("curve {variant:?} is not compiled in"))
}

impl EcdsaArithmetic for NativeEcdsa {
    fn ecdsa_combine(
        &self,
        variant: EcdsaVariant,
        big_r: &[u8],
        shares: &[Vec<u8>],
    ) -> Result<RawEcdsaSignature, ProviderError> {
        match variant {
            #[cfg(feature = "k256")]
            EcdsaVariant::K256 => combine::<k256::Secp256k1>(big_r, shares),
            #[cfg(feature = "p256")]
            EcdsaVariant::P256 => combine::<p256::NistP256>(big_r, shares),
            #[allow(unreachable_patterns)]
            _ => Err(not_compiled_in(variant)),
        }
    }

    fn ecdsa_verify(
        &self,
        variant: EcdsaVariant,
        message_hash: &[u8],
        public_key: &[u8],
        signature: &RawEcdsaSignature,
    ) -> Result<(), ProviderError> {
        match variant {
            #[cfg(feature = "k256")]
            EcdsaVariant::K256 => verify::<k256::Secp256k1>(message_hash, public_key, signature),
            #[cfg(feature = "p256")]
            EcdsaVariant::P256 => verify::<p256::NistP256>(message_hash, public_key, signature),
            #[allow(unreachable_patterns)]
            _ => Err(not_compiled_in(variant)),
        }
    }

    fn ecdsa_derive_key(
        &self,
        variant: EcdsaVariant,
        key_id: &[u8],
        public_keys: &[Vec<u8>],
    ) -> Result<Vec<u8>, ProviderError> {
        match variant {
            #[cfg(feature = "k256")]
            EcdsaVariant::K256 => derive_key::<k256::Secp256k1>(key_id, public_keys),
            #[cfg(feature = "p256")]
            EcdsaVariant::P256 => derive_key::<p256::NistP256>(key_id, public_keys),
            #[allow(unreachable_patterns)]
            _ => Err(not_compiled_in(variant)),
        }
    }
}

#[cfg(all(test, feature = "k256"))]
mod test {
    use k256::{
        ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey},
        Secp256k1,
    };

    use super::*;
    use crate::test::run_ceremony;

    #[test]
    fn test_combine_matches_standard_verifier() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 3, 7], 3, b"hello?");
        let raw = NativeEcdsa
            .ecdsa_combine(
                EcdsaVariant::K256,
                &ceremony.big_r_bytes(),
                &ceremony.share_bytes(),
            )
            .unwrap();
        NativeEcdsa
            .ecdsa_verify(
                EcdsaVariant::K256,
                &ceremony.msg_hash,
                &ceremony.public_key_bytes(),
                &raw,
            )
            .unwrap();

        let mut rs = raw.r.clone();
        rs.extend_from_slice(&raw.s);
        let sig = Signature::from_slice(&rs).unwrap();
        let sig = sig.normalize_s().unwrap_or(sig);
        let vk = VerifyingKey::from_sec1_bytes(&ceremony.public_key_bytes()).unwrap();
        vk.verify_prehash(&ceremony.msg_hash, &sig).unwrap();
    }

    #[test]
    fn test_missing_share_fails_verification() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1, 2], 3, b"hello?");
        let mut shares = ceremony.share_bytes();
        shares.pop();
        let raw = NativeEcdsa
            .ecdsa_combine(EcdsaVariant::K256, &ceremony.big_r_bytes(), &shares)
            .unwrap();
        assert!(NativeEcdsa
            .ecdsa_verify(
                EcdsaVariant::K256,
                &ceremony.msg_hash,
                &ceremony.public_key_bytes(),
                &raw,
            )
            .is_err());
    }

    #[test]
    fn test_combine_rejects_bad_inputs() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1], 2, b"hello?");
        assert!(NativeEcdsa
            .ecdsa_combine(EcdsaVariant::K256, &ceremony.big_r_bytes(), &[])
            .is_err());
        // Neither a SEC1 tag nor a full point.
        for big_r in [&[0x05u8; 33][..], &[0x02; 1]] {
            let err = NativeEcdsa
                .ecdsa_combine(EcdsaVariant::K256, big_r, &ceremony.share_bytes())
                .unwrap_err();
            assert_eq!(err.to_string(), "cannot deserialize bigR");
        }
        let err = NativeEcdsa
            .ecdsa_combine(EcdsaVariant::K256, &ceremony.big_r_bytes(), &[vec![1u8; 5]])
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot deserialize share 0");
    }

    #[test]
    fn test_derive_key_is_a_polynomial_in_the_key_id() {
        let g = k256::ProjectivePoint::GENERATOR;
        let k0 = g * k256::Scalar::from(3u64);
        let k1 = g * k256::Scalar::from(5u64);
        let keys = vec![
            Secp256k1::encode_point(&k0.to_affine(), true),
            Secp256k1::encode_point(&k1.to_affine(), false),
        ];
        let derived = NativeEcdsa
            .ecdsa_derive_key(EcdsaVariant::K256, b"key-id", &keys)
            .unwrap();

        let d = Secp256k1::hd_scalar(b"key-id").unwrap();
        let expected = k0 + k1 * d;
        assert_eq!(derived, Secp256k1::encode_point(&expected.to_affine(), false));
    }
}
