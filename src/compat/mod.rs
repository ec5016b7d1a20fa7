use elliptic_curve::{
    generic_array::typenum::Unsigned, ops::Reduce, point::AffineCoordinates, scalar::IsHigh,
    Curve, CurveArithmetic, FieldBytes, PrimeCurve, PrimeField,
};
use subtle::ConditionallySelectable;

#[cfg(feature = "k256")]
pub mod k256_impl;
#[cfg(feature = "p256")]
pub mod p256_impl;

/// Represents an ECDSA curve the native arithmetic provider can combine over.
///
/// The bulk of the trait are the bounds requiring a curve according
/// to RustCrypto's traits.
///
/// Beyond that, each curve needs a name, a domain separation tag for
/// HD key derivation, and SEC1 encoding for points, which RustCrypto only
/// exposes through per-curve bounds.
pub trait EcdsaCurve: PrimeCurve + CurveArithmetic {
    const NAME: &'static str;

    /// Domain separation tag used when hashing a key id to a scalar.
    const HD_CTX: &'static [u8];

    /// Decode a SEC1 point, compressed or not.
    fn decode_point(bytes: &[u8]) -> Option<Self::ProjectivePoint>;

    /// Encode a point in SEC1 form.
    fn encode_point(point: &Self::AffinePoint, compress: bool) -> Vec<u8>;

    /// Hash a key id to a scalar using `expand_message_xmd` with SHA-256.
    fn hd_scalar(key_id: &[u8]) -> Option<Self::Scalar>;
}

/// Get the x coordinate of a point, as a scalar
pub(crate) fn x_coordinate<C: EcdsaCurve>(point: &C::AffinePoint) -> C::Scalar {
    <C::Scalar as Reduce<<C as Curve>::Uint>>::reduce_bytes(&point.x())
}

/// Parse a big-endian scalar of exactly the field size, rejecting values >= n.
pub(crate) fn scalar_from_bytes<C: EcdsaCurve>(bytes: &[u8]) -> Option<C::Scalar> {
    if bytes.len() != C::FieldBytesSize::USIZE {
        return None;
    }
    let repr = FieldBytes::<C>::clone_from_slice(bytes);
    Option::from(C::Scalar::from_repr(repr))
}

/// Reduce a message digest of exactly the field size to a scalar.
pub(crate) fn scalar_from_digest<C: EcdsaCurve>(digest: &[u8]) -> Option<C::Scalar> {
    if digest.len() != C::FieldBytesSize::USIZE {
        return None;
    }
    let bytes = FieldBytes::<C>::clone_from_slice(digest);
    Some(<C::Scalar as Reduce<<C as Curve>::Uint>>::reduce_bytes(&bytes))
}

pub(crate) fn scalar_to_bytes<C: EcdsaCurve>(scalar: &C::Scalar) -> Vec<u8> {
    scalar.to_repr().to_vec()
}

/// Move `s` into the lower half of the scalar field.
///
/// Negating `s` corresponds to negating the nonce point, so the recovery bit
/// flips along with it.
pub(crate) fn normalize_s<C: EcdsaCurve>(mut s: C::Scalar, recovery_id: u8) -> (C::Scalar, u8) {
    let high = s.is_high();
    s.conditional_assign(&(-s), high);
    (s, recovery_id ^ high.unwrap_u8())
}
