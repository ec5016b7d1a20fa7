//! BLS12-381 signature share combination and identity-based encryption.
//!
//! Public keys live in G1 and are 48 bytes, signatures and shares live in G2.
//! A combined network signature over an identity doubles as the decryption
//! key for data encrypted to that identity.
use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    curve::BlsVariant,
    error::{decode_base64, decode_hex, strip_hex_prefix, CombineError, Result},
    provider::BlsArithmetic,
};

/// Hex length of a compressed G1 public key.
const PUBLIC_KEY_HEX_LEN: usize = 96;

/// One signer node's share of a proof-of-possession signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlsSignatureShare {
    #[serde(rename = "ProofOfPossession")]
    pub proof_of_possession: ProofOfPossession,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfPossession {
    pub identifier: String,
    pub value: String,
}

impl BlsSignatureShare {
    pub fn new(identifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            proof_of_possession: ProofOfPossession {
                identifier: identifier.into(),
                value: value.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlsEngine<P> {
    provider: P,
}

impl<P: BlsArithmetic> BlsEngine<P> {
    const VARIANT: BlsVariant = BlsVariant::Bls12381G2;

    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Encrypt `message` to `identity` under the network public key.
    ///
    /// Returns the base64 ciphertext.
    pub fn encrypt(&self, public_key: &str, message: &[u8], identity: &[u8]) -> Result<String> {
        let public_key = strip_hex_prefix(public_key);
        if public_key.len() != PUBLIC_KEY_HEX_LEN {
            return Err(CombineError::InvalidParamType(format!(
                "BLS public key must be {PUBLIC_KEY_HEX_LEN} hex characters, got {}",
                public_key.len()
            )));
        }
        let public_key = decode_hex("publicKey", public_key)?;
        let ciphertext = self
            .provider
            .bls_encrypt(Self::VARIANT, &public_key, message, identity)?;
        Ok(Base64::encode_string(&ciphertext))
    }

    /// Combine shares into the hex encoded group signature.
    pub fn combine_signature_shares(&self, shares: &[BlsSignatureShare]) -> Result<String> {
        if shares.is_empty() {
            return Err(CombineError::NoValidShares { total: 0 });
        }
        let serialized = shares
            .iter()
            .enumerate()
            .map(|(i, share)| {
                let pop = &share.proof_of_possession;
                if pop.identifier.is_empty() || pop.value.is_empty() {
                    return Err(CombineError::InvalidParamType(format!(
                        "BLS share {i} is missing its identifier or value"
                    )));
                }
                serde_json::to_string(share)
                    .map_err(|e| CombineError::InvalidParamType(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(shares = serialized.len(), "combining BLS signature shares");

        let signature = self.provider.bls_combine(Self::VARIANT, &serialized)?;
        Ok(hex::encode(signature))
    }

    pub fn verify_signature(
        &self,
        public_key: &str,
        message: &[u8],
        signature: &str,
    ) -> Result<()> {
        let public_key = decode_hex("publicKey", public_key)?;
        let signature = decode_hex("signature", signature)?;
        self.provider
            .bls_verify(Self::VARIANT, &public_key, message, &signature)
            .map_err(|e| CombineError::SignatureVerificationFailed(e.to_string()))
    }

    /// Combine the shares and use the signature to decrypt `ciphertext`.
    pub fn decrypt_with_signature_shares(
        &self,
        ciphertext: &str,
        shares: &[BlsSignatureShare],
    ) -> Result<Vec<u8>> {
        let ciphertext = decode_base64("ciphertext", ciphertext)?;
        let signature = self.combine_signature_shares(shares)?;
        self.decrypt(&ciphertext, &signature)
    }

    /// Like [`Self::decrypt_with_signature_shares`], but the combined signature
    /// must first verify over `identity`. Nothing is decrypted otherwise.
    pub fn verify_and_decrypt_with_signature_shares(
        &self,
        public_key: &str,
        identity: &[u8],
        ciphertext: &str,
        shares: &[BlsSignatureShare],
    ) -> Result<Vec<u8>> {
        let ciphertext = decode_base64("ciphertext", ciphertext)?;
        let signature = self.combine_signature_shares(shares)?;
        self.verify_signature(public_key, identity, &signature)?;
        self.decrypt(&ciphertext, &signature)
    }

    fn decrypt(&self, ciphertext: &[u8], signature: &str) -> Result<Vec<u8>> {
        let signature = decode_hex("signature", signature)?;
        Ok(self
            .provider
            .bls_decrypt(Self::VARIANT, ciphertext, &signature)?)
    }
}
