mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer from `offset`, failing on a short read
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        if end.is_none_or(|end| end > self.size()) {
            bail!(
                "Read of {} bytes at offset {} is past the end of the source ({} bytes)",
                buf.len(),
                offset,
                self.size()
            );
        }

        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                bail!("Unexpected end of source at offset {}", offset + filled as u64);
            }
            filled += n;
        }
        Ok(())
    }
}

/// Returns true when `path` names a remote archive rather than a local file
pub fn is_http_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Open a top-level input, either a local file or an HTTP(S) URL
pub async fn open_source(path: &str) -> Result<Arc<dyn ReadAt>> {
    if is_http_url(path) {
        Ok(Arc::new(HttpRangeReader::new(path.to_string()).await?))
    } else {
        Ok(Arc::new(LocalFileReader::new(Path::new(path))?))
    }
}
