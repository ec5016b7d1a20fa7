use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    compat,
    curve::{self, EcdsaVariant, SigType},
    error::{decode_hex, strip_hex_prefix, CombineError, Result},
    participants::ParticipantList,
    provider::{EcdsaArithmetic, RawEcdsaSignature},
};

/// One signer node's partial ECDSA signature.
///
/// All hex fields may carry a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureShare {
    pub sig_type: String,
    /// Hex partial scalar. Empty when the node produced no share.
    #[serde(default)]
    pub signature_share: String,
    pub share_index: u32,
    /// The SEC1 public key the combined signature must verify against.
    pub public_key: String,
    /// The message digest that was signed.
    pub data_signed: String,
    /// The nonce commitment point shared by every share of one ceremony.
    pub big_r: String,
    /// Caller bookkeeping, never inspected.
    #[serde(default)]
    pub sig_name: String,
}

impl SignatureShare {
    fn has_share(&self) -> bool {
        !strip_hex_prefix(self.signature_share.trim()).is_empty()
    }
}

/// A verified, low-s ECDSA signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSignature {
    /// Hex, big-endian.
    pub r: String,
    /// Hex, big-endian, in the lower half of the scalar field.
    pub s: String,
    /// Parity of the nonce point's y coordinate, 0 or 1.
    pub recid: u8,
    pub public_key: String,
    pub data_signed: String,
    pub sig_name: String,
}

impl CombinedSignature {
    /// The 65 byte `r || s || v` encoding, with `v = recid + 27`.
    pub fn to_rsv(&self) -> Result<Vec<u8>> {
        let mut out = decode_hex("r", &self.r)?;
        out.extend(decode_hex("s", &self.s)?);
        out.push(self.recid + 27);
        Ok(out)
    }

    /// The `0x`-prefixed hex of [`Self::to_rsv`].
    pub fn to_hex(&self) -> Result<String> {
        Ok(format!("0x{}", hex::encode(self.to_rsv()?)))
    }
}

/// Combines threshold ECDSA shares into one signature.
///
/// A signature is only ever returned after it verified against the public key
/// and message of the shares.
#[derive(Debug, Clone, Default)]
pub struct EcdsaCombiner<P> {
    provider: P,
}

impl<P: EcdsaArithmetic> EcdsaCombiner<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn combine(&self, shares: &[SignatureShare]) -> Result<CombinedSignature> {
        let valid: Vec<&SignatureShare> = shares.iter().filter(|s| s.has_share()).collect();
        debug!(
            total = shares.len(),
            valid = valid.len(),
            "combining ECDSA signature shares"
        );

        let reference = *valid
            .first()
            .ok_or(CombineError::NoValidShares { total: shares.len() })?;
        let variant = curve::resolve_ecdsa(&reference.sig_type)?;
        let signers = check_consistency(reference, &valid)?;
        debug!(?variant, signers = ?signers.indices(), "shares are consistent");

        let big_r = decode_hex("bigR", &reference.big_r)?;
        let public_key = decode_hex("publicKey", &reference.public_key)?;
        let message_hash = decode_hex("dataSigned", &reference.data_signed)?;
        let share_bytes = valid
            .iter()
            .map(|s| decode_hex("signatureShare", &s.signature_share))
            .collect::<Result<Vec<_>>>()?;

        // The provider only rejects points and scalars it cannot decode.
        let raw = self
            .provider
            .ecdsa_combine(variant, &big_r, &share_bytes)
            .map_err(|e| CombineError::InvalidParamType(e.to_string()))?;
        self.provider
            .ecdsa_verify(variant, &message_hash, &public_key, &raw)
            .map_err(|e| CombineError::SignatureVerificationFailed(e.to_string()))?;

        let (s, recid) = normalize(variant, &raw)?;
        Ok(CombinedSignature {
            r: hex::encode(&raw.r),
            s: hex::encode(s),
            recid,
            public_key: strip_hex_prefix(&reference.public_key).to_string(),
            data_signed: strip_hex_prefix(&reference.data_signed).to_string(),
            sig_name: reference.sig_name.clone(),
        })
    }
}

fn same_hex(a: &str, b: &str) -> bool {
    strip_hex_prefix(a.trim()).eq_ignore_ascii_case(strip_hex_prefix(b.trim()))
}

/// Every share must come from the same ceremony as the reference share, and
/// each signer may only contribute once.
fn check_consistency(
    reference: &SignatureShare,
    shares: &[&SignatureShare],
) -> Result<ParticipantList> {
    let reference_type: SigType = reference.sig_type.parse()?;
    for share in shares {
        let inconsistent = |field| CombineError::InconsistentShares {
            share_index: share.share_index,
            field,
        };
        if share.sig_type.parse::<SigType>().ok() != Some(reference_type) {
            return Err(inconsistent("sigType"));
        }
        if !same_hex(&share.big_r, &reference.big_r) {
            return Err(inconsistent("bigR"));
        }
        if !same_hex(&share.public_key, &reference.public_key) {
            return Err(inconsistent("publicKey"));
        }
        if !same_hex(&share.data_signed, &reference.data_signed) {
            return Err(inconsistent("dataSigned"));
        }
    }

    let indices: Vec<u32> = shares.iter().map(|s| s.share_index).collect();
    ParticipantList::new(&indices).ok_or_else(|| CombineError::InconsistentShares {
        share_index: ParticipantList::first_duplicate(&indices).unwrap_or_default(),
        field: "shareIndex",
    })
}

/// Bring `s` into low-s form, returning it with the matching recovery id.
fn normalize(variant: EcdsaVariant, raw: &RawEcdsaSignature) -> Result<(Vec<u8>, u8)> {
    if raw.recovery_id > 1 {
        return Err(CombineError::SignatureVerificationFailed(format!(
            "invalid recovery id {}",
            raw.recovery_id
        )));
    }
    match variant {
        #[cfg(feature = "k256")]
        EcdsaVariant::K256 => normalize_with::<k256::Secp256k1>(&raw.s, raw.recovery_id),
        #[cfg(feature = "p256")]
        EcdsaVariant::P256 => normalize_with::<p256::NistP256>(&raw.s, raw.recovery_id),
        #[allow(unreachable_patterns)]
        _ => Err(CombineError::UnsupportedCurve(format!("{variant:?}"))),
    }
}

fn normalize_with<C: compat::EcdsaCurve>(s: &[u8], recovery_id: u8) -> Result<(Vec<u8>, u8)> {
    let s = compat::scalar_from_bytes::<C>(s).ok_or_else(|| {
        CombineError::SignatureVerificationFailed(format!("invalid {} s component", C::NAME))
    })?;
    let (s, recovery_id) = compat::normalize_s::<C>(s, recovery_id);
    Ok((compat::scalar_to_bytes::<C>(&s), recovery_id))
}

#[cfg(all(test, feature = "k256"))]
mod test {
    use std::{error::Error, result::Result};

    use k256::Secp256k1;

    use super::*;
    use crate::{
        address::{ecrecover, eth_address},
        error::ErrorKind,
        provider::native::NativeEcdsa,
        test::{run_ceremony, CountingEcdsa},
    };

    #[test]
    fn test_three_shares_recover_signer_address() -> Result<(), Box<dyn Error>> {
        for _ in 0..4 {
            let ceremony = run_ceremony::<Secp256k1>(&[2, 5, 11], 3, b"hello?");
            let shares = ceremony.signature_shares("K256");
            assert!(shares[0].big_r.starts_with("02") || shares[0].big_r.starts_with("03"));

            let sig = EcdsaCombiner::new(NativeEcdsa).combine(&shares)?;
            assert!(sig.recid <= 1);
            assert_eq!(sig.to_rsv()?.len(), 65);

            let hash = hex::decode(&sig.data_signed)?;
            let public_key = ceremony.public_key_bytes();
            assert_eq!(ecrecover(&hash, &sig)?, eth_address(&public_key)?);
        }
        Ok(())
    }

    #[cfg(feature = "p256")]
    #[test]
    fn test_p256_shares_verify() -> Result<(), Box<dyn Error>> {
        use p256::{
            ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey},
            NistP256,
        };

        let ceremony = run_ceremony::<NistP256>(&[0, 2, 3], 3, b"p256 message");
        let mut shares = ceremony.signature_shares("EcdsaCaitSithP256");
        // node 1 answered without a share
        let mut absent = shares[0].clone();
        absent.share_index = 1;
        absent.signature_share.clear();
        shares.insert(1, absent);

        let sig = EcdsaCombiner::new(NativeEcdsa).combine(&shares)?;
        let mut rs = hex::decode(&sig.r)?;
        rs.extend(hex::decode(&sig.s)?);
        let signature = Signature::from_slice(&rs)?;
        assert!(signature.normalize_s().is_none());
        VerifyingKey::from_sec1_bytes(&ceremony.public_key_bytes())?
            .verify_prehash(&ceremony.msg_hash, &signature)?;
        Ok(())
    }

    #[test]
    fn test_all_empty_shares() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1], 2, b"hello?");
        let mut shares = ceremony.signature_shares("K256");
        for share in &mut shares {
            share.signature_share = String::new();
        }
        shares[0].signature_share = "0x".to_string();
        let err = EcdsaCombiner::new(NativeEcdsa).combine(&shares).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoValidShares);
        assert!(matches!(err, CombineError::NoValidShares { total: 2 }));

        let err = EcdsaCombiner::new(NativeEcdsa).combine(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoValidShares);
    }

    #[test]
    fn test_unknown_sig_type_never_reaches_provider() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1], 2, b"hello?");
        let shares = ceremony.signature_shares("SchnorrEd25519");
        let provider = CountingEcdsa::default();
        let err = EcdsaCombiner::new(&provider).combine(&shares).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCurve);
        assert_eq!(provider.calls(), 0);

        let shares = ceremony.signature_shares("BLS");
        let err = EcdsaCombiner::new(&provider).combine(&shares).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCurve);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_share_from_another_ceremony_is_rejected() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1, 2], 3, b"hello?");
        let other = run_ceremony::<Secp256k1>(&[0, 1, 2], 3, b"hello?");
        let mut shares = ceremony.signature_shares("K256");
        shares[2] = other.signature_shares("K256")[2].clone();

        let provider = CountingEcdsa::default();
        let err = EcdsaCombiner::new(&provider).combine(&shares).unwrap_err();
        assert!(matches!(
            err,
            CombineError::InconsistentShares {
                share_index: 2,
                field: "bigR"
            }
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_duplicate_share_index_is_rejected() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1, 2], 3, b"hello?");
        let mut shares = ceremony.signature_shares("K256");
        shares[2].share_index = shares[0].share_index;
        let err = EcdsaCombiner::new(NativeEcdsa).combine(&shares).unwrap_err();
        assert!(matches!(
            err,
            CombineError::InconsistentShares {
                field: "shareIndex",
                ..
            }
        ));
    }

    #[test]
    fn test_undecodable_point_is_a_parameter_error() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1], 2, b"hello?");
        let mut shares = ceremony.signature_shares("K256");
        for share in &mut shares {
            share.big_r = format!("05{}", &share.big_r[2..]);
        }
        let err = EcdsaCombiner::new(NativeEcdsa).combine(&shares).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParamType);
        assert!(err.to_string().contains("cannot deserialize bigR"));

        let mut shares = ceremony.signature_shares("K256");
        shares[1].signature_share = "ff".repeat(32);
        let err = EcdsaCombiner::new(NativeEcdsa).combine(&shares).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParamType);
    }

    #[test]
    fn test_tampered_share_is_never_returned() {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1, 2], 3, b"hello?");
        let mut shares = ceremony.signature_shares("K256");
        shares[1] = ceremony.signature_shares("K256")[0].clone();
        shares[1].share_index = 1;
        let err = EcdsaCombiner::new(NativeEcdsa).combine(&shares).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureVerificationFailed);
    }

    #[test]
    fn test_shares_parse_from_node_json() -> Result<(), Box<dyn Error>> {
        let ceremony = run_ceremony::<Secp256k1>(&[0, 1], 2, b"hello?");
        let json = serde_json::to_string(&ceremony.signature_shares("ECDSA_CAIT_SITH"))?;
        assert!(json.contains("\"bigR\""));
        assert!(json.contains("\"signatureShare\""));

        let mut shares: Vec<SignatureShare> = serde_json::from_str(&json)?;
        for share in &mut shares {
            share.public_key = format!("0x{}", share.public_key);
            share.sig_name = "sig1".to_string();
        }
        let sig = EcdsaCombiner::new(NativeEcdsa).combine(&shares)?;
        assert_eq!(sig.sig_name, "sig1");
        assert!(!sig.public_key.starts_with("0x"));
        Ok(())
    }
}
