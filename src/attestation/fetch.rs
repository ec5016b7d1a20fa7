//! Retrieval of VCEK certificates from the AMD Key Distribution Service.
use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{CombineError, Result},
};

/// Something that can GET a certificate by URL.
pub trait CertificateFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

impl<F: CertificateFetcher + ?Sized> CertificateFetcher for &F {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        (**self).fetch(url)
    }
}

/// Fetch `url` through `proxy` when one is set, falling back to fetching it
/// directly exactly once if the proxied request fails.
pub async fn fetch_with_fallback<G, Fut>(proxy: Option<&str>, url: &str, get: G) -> Result<Vec<u8>>
where
    G: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    let Some(proxy) = proxy else {
        return get(url.to_string()).await;
    };
    match get(format!("{proxy}{url}")).await {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            warn!(error = %e, url, "proxied certificate fetch failed, fetching directly");
            get(url.to_string()).await
        }
    }
}

/// Fetches certificates over HTTPS with reqwest.
#[derive(Debug, Clone)]
pub struct HttpCertificateFetcher {
    client: reqwest::Client,
    cors_proxy_url: Option<String>,
}

impl HttpCertificateFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config.fetch_timeout)?,
            cors_proxy_url: config.cors_proxy_url.clone(),
        })
    }

    async fn get(&self, target: String) -> Result<Vec<u8>> {
        debug!(url = %target, "fetching VCEK certificate");
        let response = self
            .client
            .get(&target)
            .send()
            .await
            .map_err(|e| CombineError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CombineError::NetworkError(format!(
                "HTTP {} fetching VCEK certificate from {target}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CombineError::NetworkError(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CombineError::NetworkError(format!("failed to create HTTP client: {e}")))
}

impl CertificateFetcher for HttpCertificateFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let url = url.to_string();
        async move {
            fetch_with_fallback(self.cors_proxy_url.as_deref(), &url, |target| self.get(target))
                .await
        }
    }
}
