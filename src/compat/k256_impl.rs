use super::EcdsaCurve;

use elliptic_curve::{
    hash2curve::{ExpandMsgXmd, GroupDigest},
    sec1::{FromEncodedPoint, ToEncodedPoint},
};
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar, Secp256k1};
use sha2::Sha256;

impl EcdsaCurve for Secp256k1 {
    const NAME: &'static str = "K256";
    const HD_CTX: &'static [u8] = b"LIT_HD_KEY_ID_K256_XMD:SHA-256_SSWU_RO_NUL_";

    fn decode_point(bytes: &[u8]) -> Option<ProjectivePoint> {
        let encoded = EncodedPoint::from_bytes(bytes).ok()?;
        Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .map(ProjectivePoint::from)
    }

    fn encode_point(point: &AffinePoint, compress: bool) -> Vec<u8> {
        point.to_encoded_point(compress).as_bytes().to_vec()
    }

    fn hd_scalar(key_id: &[u8]) -> Option<Scalar> {
        <Secp256k1 as GroupDigest>::hash_to_scalar::<ExpandMsgXmd<Sha256>>(
            &[key_id],
            &[Self::HD_CTX],
        )
        .ok()
    }
}
