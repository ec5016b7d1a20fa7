//! Threshold-combine is the client side of a threshold signing network:
//! it turns the partial results of independent signer nodes into one
//! usable signature, and checks that those nodes run where they claim to.
//!
//! No node ever holds a full private key. A client asks a threshold of
//! nodes to sign, each returns a share, and the client combines them. The
//! same holds for BLS, where a combined signature over an identity is the
//! key that decrypts data encrypted to that identity.
//!
//! # Warning
//!
//! Combining shares is only half of the picture, the nodes themselves must
//! be trusted to run the expected code. Always check their attestations
//! before sending them anything sensitive.
//!
//! # Design
//!
//! Everything here is orchestration around an *arithmetic provider*: share
//! filtering and consistency checks, scheme resolution, verification and
//! normalization. The curve, pairing and attestation math sits behind the
//! traits in [`provider`]:
//! ```ignore
//! pub trait EcdsaArithmetic {
//!     fn ecdsa_combine(&self, variant, big_r, shares) -> Result<RawEcdsaSignature, ProviderError>;
//!     fn ecdsa_verify(&self, variant, message_hash, public_key, signature) -> Result<(), ProviderError>;
//!     fn ecdsa_derive_key(&self, variant, key_id, public_keys) -> Result<Vec<u8>, ProviderError>;
//! }
//! ```
//!
//! The guarantee this crate adds on top is that a combined signature is
//! never returned without having been verified against the public key and
//! message of its shares, and that a BLS ciphertext is only decrypted after
//! the combined signature checked out, when asked to verify.
//!
//! The main entry points are:
//!
//! - [`EcdsaCombiner`], combining ECDSA shares into a low-s signature with recovery id.
//! - [`compute_hd_pub_key`], deriving a child public key from node key shares.
//! - [`BlsEngine`], for BLS share combination and identity based encryption.
//! - [`AttestationVerifier`], checking AMD SEV-SNP attestations of nodes.
//! - [`generate_session_key_pair`], for Ed25519 session keys.
//!
//! # Generic Curves
//!
//! The native ECDSA provider is generic over an `EcdsaCurve` trait, which
//! can be implemented for any curve from the RustCrypto
//! [elliptic-curves](https://github.com/RustCrypto/elliptic-curves) suite.
//!
//! Implementations for some existing curves live behind features, as per
//! the following table:
//!
//! | Curve | Feature | Scheme tags |
//! |-------|---------|-------------|
//! |Secp256k1|`k256`|`K256`, `ECDSA_CAIT_SITH`, `EcdsaK256`, ...|
//! |P-256|`p256`|`EcdsaCaitSithP256`, `EcdsaP256`, ...|
//!
//! A BLS12-381 provider built on `blsful` is available behind the `blsful`
//! feature. Attestation report verification has no bundled provider.
#[cfg(feature = "k256")]
pub mod address;
pub mod attestation;
pub mod bls;
pub mod cache;
mod compat;
pub mod config;
pub mod curve;
pub mod ecdsa;
pub mod error;
pub mod hd;
mod participants;
pub mod provider;
pub mod session;

pub use attestation::{
    AttestationBytes, AttestationVerifier, CertificateFetcher, HttpCertificateFetcher,
    NodeAttestation,
};
pub use bls::{BlsEngine, BlsSignatureShare};
pub use cache::{
    open_certificate_cache, CertificateCache, MemoryCertificateCache, RedbCertificateCache,
};
pub use compat::EcdsaCurve;
pub use config::Config;
pub use curve::{BlsVariant, CurveVariant, EcdsaVariant, SigType};
pub use ecdsa::{CombinedSignature, EcdsaCombiner, SignatureShare};
pub use error::{CombineError, ErrorKind, Result};
pub use hd::compute_hd_pub_key;
pub use session::{generate_session_key_pair, SessionKeyPair};
