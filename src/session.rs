//! Ed25519 session keys, used to sign requests to signer nodes.
use ed25519_dalek::{SigningKey, KEYPAIR_LENGTH};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{decode_hex, CombineError, Result};

/// A hex encoded Ed25519 keypair.
///
/// `secret_key` is the 64 byte `seed || public key` layout used by NaCl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeyPair {
    pub public_key: String,
    pub secret_key: String,
}

impl SessionKeyPair {
    pub fn signing_key(&self) -> Result<SigningKey> {
        let bytes = decode_hex("secretKey", &self.secret_key)?;
        let bytes: [u8; KEYPAIR_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
            CombineError::InvalidParamType(format!(
                "secretKey must be {KEYPAIR_LENGTH} bytes, got {}",
                b.len()
            ))
        })?;
        // Also checks that the public half matches the seed.
        SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| CombineError::InvalidParamType(format!("invalid secretKey: {e}")))
    }
}

/// Generate a fresh session keypair from the OS RNG.
pub fn generate_session_key_pair() -> SessionKeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    SessionKeyPair {
        public_key: hex::encode(signing_key.verifying_key().to_bytes()),
        secret_key: hex::encode(signing_key.to_keypair_bytes()),
    }
}
