//! Mapping from the scheme tags signer nodes report to the curve variants
//! the arithmetic provider is parameterized by.
use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CombineError, Result};

/// The ECDSA curves the arithmetic provider can combine over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcdsaVariant {
    K256,
    P256,
}

/// Pairing variants for BLS. Signatures live in G2, public keys in G1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlsVariant {
    Bls12381G2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveVariant {
    Ecdsa(EcdsaVariant),
    Bls(BlsVariant),
}

/// A signature scheme tag, as reported by signer nodes in `sigType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigType {
    EcdsaK256,
    EcdsaP256,
    Bls,
}

/// Every accepted tag with the scheme it names. The first tag for each
/// scheme is its canonical spelling.
const SIG_TYPE_TAGS: &[(&str, SigType)] = &[
    ("K256", SigType::EcdsaK256),
    ("ECDSA_CAIT_SITH", SigType::EcdsaK256),
    ("EcdsaK256", SigType::EcdsaK256),
    ("EcdsaK256Sha256", SigType::EcdsaK256),
    ("EcdsaCaitSithSecp256k1", SigType::EcdsaK256),
    ("EcdsaCaitSithP256", SigType::EcdsaP256),
    ("EcdsaP256", SigType::EcdsaP256),
    ("EcdsaP256Sha256", SigType::EcdsaP256),
    ("BLS", SigType::Bls),
    ("Bls12381", SigType::Bls),
    ("Bls12381G1ProofOfPossession", SigType::Bls),
];

impl SigType {
    pub fn variant(&self) -> CurveVariant {
        match self {
            SigType::EcdsaK256 => CurveVariant::Ecdsa(EcdsaVariant::K256),
            SigType::EcdsaP256 => CurveVariant::Ecdsa(EcdsaVariant::P256),
            SigType::Bls => CurveVariant::Bls(BlsVariant::Bls12381G2),
        }
    }

    pub fn as_str(&self) -> &'static str {
        SIG_TYPE_TAGS
            .iter()
            .find(|(_, t)| t == self)
            .map(|(tag, _)| *tag)
            .unwrap_or_default()
    }
}

impl FromStr for SigType {
    type Err = CombineError;

    fn from_str(s: &str) -> Result<Self> {
        SIG_TYPE_TAGS
            .iter()
            .find(|(tag, _)| *tag == s)
            .map(|(_, t)| *t)
            .ok_or_else(|| CombineError::UnsupportedCurve(s.to_string()))
    }
}

impl fmt::Display for SigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a `sigType` tag to the curve variant for the arithmetic provider.
pub fn resolve(sig_type: &str) -> Result<CurveVariant> {
    Ok(sig_type.parse::<SigType>()?.variant())
}

/// Resolve a tag, requiring an ECDSA variant.
///
/// Unknown tags and non-ECDSA tags both fail with `UnsupportedCurve`.
pub fn resolve_ecdsa(sig_type: &str) -> Result<EcdsaVariant> {
    match resolve(sig_type)? {
        CurveVariant::Ecdsa(v) => Ok(v),
        CurveVariant::Bls(_) => Err(CombineError::UnsupportedCurve(sig_type.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_legacy_aliases_resolve() {
        assert_eq!(
            resolve("ECDSA_CAIT_SITH").unwrap(),
            CurveVariant::Ecdsa(EcdsaVariant::K256)
        );
        assert_eq!(
            resolve("EcdsaCaitSithP256").unwrap(),
            CurveVariant::Ecdsa(EcdsaVariant::P256)
        );
        assert_eq!(
            resolve("BLS").unwrap(),
            CurveVariant::Bls(BlsVariant::Bls12381G2)
        );
    }

    #[test]
    fn test_unknown_tag_is_unsupported_curve() {
        let err = resolve("EcdsaEd25519").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCurve);
        let err = resolve_ecdsa("BLS").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCurve);
    }

    #[test]
    fn test_display_uses_canonical_tag() {
        let t: SigType = "EcdsaK256Sha256".parse().unwrap();
        assert_eq!(t.to_string(), "K256");
        assert_eq!(SigType::EcdsaP256.to_string(), "EcdsaCaitSithP256");
    }
}
