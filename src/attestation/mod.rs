//! Validation of AMD SEV-SNP attestations presented by signer nodes.
//!
//! A node answers a handshake challenge with an attestation report bound to
//! the challenge, its external address and its session data. Checking it
//! happens in order, each step terminal:
//!
//! 1. decode the payload, base64 strings or JSON byte arrays,
//! 2. the nonce must equal the challenge,
//! 3. the attested address must be the one actually contacted,
//! 4. the VCEK certificate is taken from the cache or fetched,
//! 5. the arithmetic provider verifies the report signature and bindings.
use std::collections::BTreeMap;

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{
    cache::CertificateCache,
    error::{decode_base64, decode_hex, CombineError, Result},
    provider::SevSnpArithmetic,
};

mod fetch;

pub use fetch::{fetch_with_fallback, CertificateFetcher, HttpCertificateFetcher};

pub const ATTESTATION_TYPE: &str = "AMD_SEV_SNP";

/// Key of the `data` entry holding the node's `host:port`.
pub const EXTERNAL_ADDR: &str = "EXTERNAL_ADDR";

/// Handshake challenges are 32 random bytes.
pub const CHALLENGE_LEN: usize = 32;

/// Anything shorter than this cannot be a DER certificate.
const MIN_CERTIFICATE_LEN: usize = 256;

/// A binary attestation field. Nodes send either a base64 string or a JSON
/// array of bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttestationBytes {
    Base64(String),
    Raw(Vec<u8>),
}

impl AttestationBytes {
    pub fn base64(bytes: &[u8]) -> Self {
        Self::Base64(Base64::encode_string(bytes))
    }

    fn decode(&self, field: &str) -> Result<Vec<u8>> {
        match self {
            Self::Base64(s) => decode_base64(field, s),
            Self::Raw(bytes) => Ok(bytes.clone()),
        }
    }
}

/// An attestation as returned by a node's handshake endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttestation {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attestation_type: Option<String>,
    /// Echo of the challenge.
    pub noonce: AttestationBytes,
    /// Values bound into the report.
    #[serde(default)]
    pub data: BTreeMap<String, AttestationBytes>,
    #[serde(default)]
    pub signatures: Vec<AttestationBytes>,
    /// The SEV-SNP attestation report.
    pub report: AttestationBytes,
}

struct DecodedAttestation {
    noonce: Vec<u8>,
    data: BTreeMap<String, Vec<u8>>,
    signatures: Vec<Vec<u8>>,
    report: Vec<u8>,
}

impl NodeAttestation {
    fn decode(&self) -> Result<DecodedAttestation> {
        if let Some(t) = &self.attestation_type {
            if t != ATTESTATION_TYPE {
                return Err(CombineError::InvalidParamType(format!(
                    "unsupported attestation type {t:?}"
                )));
            }
        }
        let data = self
            .data
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.decode(&format!("data.{k}"))?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let signatures = self
            .signatures
            .iter()
            .enumerate()
            .map(|(i, s)| s.decode(&format!("signatures[{i}]")))
            .collect::<Result<Vec<_>>>()?;
        Ok(DecodedAttestation {
            noonce: self.noonce.decode("noonce")?,
            data,
            signatures,
            report: self.report.decode("report")?,
        })
    }
}

/// The host and port a URL connects to.
fn endpoint_of(url: &str) -> Result<(String, u16)> {
    let parsed = Url::parse(url)
        .map_err(|e| CombineError::NetworkError(format!("invalid node url {url:?}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| CombineError::NetworkError(format!("node url {url:?} has no host")))?;
    let port = match (parsed.port(), parsed.scheme()) {
        (Some(port), _) => port,
        (None, "https") => 443,
        (None, "http") => 80,
        (None, scheme) => {
            return Err(CombineError::NetworkError(format!(
                "no default port for scheme {scheme:?} in {url:?}"
            )))
        }
    };
    Ok((host.to_string(), port))
}

/// The `host:port` the node attested to, as `(host, port)`.
fn attested_endpoint(data: &BTreeMap<String, Vec<u8>>) -> Result<(String, u16)> {
    let raw = data.get(EXTERNAL_ADDR).ok_or_else(|| {
        CombineError::NetworkError(format!("attestation is missing {EXTERNAL_ADDR}"))
    })?;
    let addr = std::str::from_utf8(raw)
        .map_err(|_| CombineError::NetworkError(format!("{EXTERNAL_ADDR} is not UTF-8")))?;
    let (host, port) = addr.rsplit_once(':').ok_or_else(|| {
        CombineError::NetworkError(format!("{EXTERNAL_ADDR} {addr:?} is not host:port"))
    })?;
    let port = port.parse::<u16>().map_err(|_| {
        CombineError::NetworkError(format!("{EXTERNAL_ADDR} {addr:?} has an invalid port"))
    })?;
    Ok((host.to_string(), port))
}

/// Checks node attestations against the challenge the caller issued.
pub struct AttestationVerifier<P, F, C> {
    provider: P,
    fetcher: F,
    cache: C,
}

impl<P, F, C> AttestationVerifier<P, F, C>
where
    P: SevSnpArithmetic,
    F: CertificateFetcher,
    C: CertificateCache,
{
    pub fn new(provider: P, fetcher: F, cache: C) -> Self {
        Self {
            provider,
            fetcher,
            cache,
        }
    }

    /// Verify `attestation`, received from the node at `url` in response to
    /// the hex `challenge`.
    pub async fn verify(
        &self,
        attestation: &NodeAttestation,
        challenge: &str,
        url: &str,
    ) -> Result<()> {
        let decoded = attestation.decode()?;

        let challenge = decode_hex("challenge", challenge)?;
        if challenge.len() != CHALLENGE_LEN {
            return Err(CombineError::InvalidParamType(format!(
                "challenge must be {CHALLENGE_LEN} bytes, got {}",
                challenge.len()
            )));
        }
        if decoded.noonce != challenge {
            return Err(CombineError::NetworkError(
                "attestation noonce does not match the challenge".to_string(),
            ));
        }

        let (host, port) = endpoint_of(url)?;
        let (attested_host, attested_port) = attested_endpoint(&decoded.data)?;
        if host != attested_host || port != attested_port {
            return Err(CombineError::NetworkError(format!(
                "attested address {attested_host}:{attested_port} \
                 does not match contacted address {host}:{port}"
            )));
        }

        let vcek_url = self.provider.vcek_url(&decoded.report)?;
        let certificate = self.certificate(&vcek_url).await?;

        self.provider
            .verify(
                &decoded.report,
                &decoded.data,
                &decoded.signatures,
                &challenge,
                &certificate,
            )
            .map_err(|e| CombineError::AttestationFailed(e.to_string()))?;
        debug!(%host, port, "attestation verified");
        Ok(())
    }

    async fn certificate(&self, vcek_url: &str) -> Result<Vec<u8>> {
        if let Some(certificate) = self.cache.get(vcek_url) {
            debug!(vcek_url, "VCEK certificate cache hit");
            return Ok(certificate);
        }
        let certificate = self.fetcher.fetch(vcek_url).await?;
        if certificate.len() < MIN_CERTIFICATE_LEN {
            return Err(CombineError::UnknownError(format!(
                "VCEK certificate from {vcek_url} is only {} bytes",
                certificate.len()
            )));
        }
        self.cache.put(vcek_url, &certificate);
        Ok(certificate)
    }
}
