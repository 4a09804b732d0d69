use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use anyhow::{Context, Result, anyhow, bail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRY: u32 = 10;

/// Remote archive read with HTTP Range requests.
///
/// Only the central directory and the entries that are actually visited
/// are fetched, so looking inside a large remote archive stays cheap.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
}

impl HttpRangeReader {
    /// Probe `url` with a HEAD request; the server must advertise byte
    /// ranges and a content length.
    pub async fn new(url: String) -> Result<Self> {
        install_crypto_provider();
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let resp = client
            .head(&url)
            .send()
            .await
            .with_context(|| format!("HEAD {url} failed"))?;
        if !resp.status().is_success() {
            bail!("HEAD {} returned status {}", url, resp.status());
        }

        let size = probe_size(&resp)?;
        debug!(url = %url, size, "remote archive supports range requests");

        Ok(Self { client, url, size })
    }

    async fn fetch_range(&self, start: u64, end: u64) -> Result<Response> {
        let range = format!("bytes={start}-{end}");
        let mut attempt = 0;
        loop {
            match self
                .client
                .get(&self.url)
                .header(header::RANGE, &range)
                .send()
                .await
            {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => return Ok(resp),
                Ok(resp) => bail!("GET {} ({}) returned status {}", self.url, range, resp.status()),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    attempt += 1;
                    if attempt >= MAX_RETRY {
                        return Err(e).context(format!("giving up on {} after {} attempts", range, attempt));
                    }
                    warn!(url = %self.url, attempt, error = %e, "range request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Make ring the process-wide rustls provider unless one is already set.
fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Losing a race to another installer is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

fn probe_size(resp: &Response) -> Result<u64> {
    let accepts_bytes = resp
        .headers()
        .get(header::ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("bytes"));
    if !accepts_bytes {
        bail!("Remote server does not support Range requests");
    }

    resp.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let wanted = (end - offset + 1) as usize;

        let mut received = 0;
        while received < wanted {
            let resp = self.fetch_range(offset + received as u64, end).await?;
            let bytes = resp.bytes().await?;
            if bytes.is_empty() {
                break;
            }
            let n = bytes.len().min(wanted - received);
            buf[received..received + n].copy_from_slice(&bytes[..n]);
            received += n;
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
