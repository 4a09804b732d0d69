use std::io::Read;
use std::sync::Arc;

use flate2::Crc;
use flate2::read::DeflateDecoder;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::io::{MemoryReader, ReadAt};
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on buffer space reserved up front from a declared entry size
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// An opened ZIP archive.
///
/// The central directory is read once when the container is opened; entry
/// data is only fetched when [`read_entry`](Self::read_entry) is called.
/// Dropping the container releases its byte source.
pub struct ZipContainer {
    parser: ZipParser<dyn ReadAt>,
    entries: Vec<ZipFileEntry>,
}

impl ZipContainer {
    /// Open an archive from any random-access source.
    pub async fn open(reader: Arc<dyn ReadAt>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files().await?;
        Ok(Self { parser, entries })
    }

    /// Reinterpret materialized entry bytes as an archive.
    pub async fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::open(Arc::new(MemoryReader::new(data))).await
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Read and decompress the full contents of `entry`.
    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_directory {
            return Ok(Vec::new());
        }

        let data_offset = self.parser.data_offset(entry).await?;
        let mut raw = vec![0u8; checked_len(self.parser.reader().size(), data_offset, entry)?];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await
            .with_context(|| format!("Cannot read data of {}", entry.file_name))?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => inflate(&raw, entry)?,
            CompressionMethod::Unknown(method) => bail!(
                "Unsupported compression method {} for {} (only STORED and DEFLATE are supported)",
                method,
                entry.file_name
            ),
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "{} decoded to {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            );
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!(
                "CRC mismatch for {}: computed {:08x}, expected {:08x}",
                entry.file_name,
                crc.sum(),
                entry.crc32
            );
        }

        Ok(data)
    }

    /// Write the decompressed contents of `entry` to `out` verbatim.
    pub async fn copy_entry<W>(&self, entry: &ZipFileEntry, out: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let data = self.read_entry(entry).await?;
        out.write_all(&data).await?;
        out.flush().await?;
        Ok(data.len() as u64)
    }
}

/// Length of the compressed data, provided it lies within the source.
fn checked_len(source_size: u64, data_offset: u64, entry: &ZipFileEntry) -> Result<usize> {
    let end = data_offset.checked_add(entry.compressed_size);
    if end.is_none_or(|end| end > source_size) {
        bail!(
            "{} claims {} compressed bytes at offset {}, past the end of the archive",
            entry.file_name,
            entry.compressed_size,
            data_offset
        );
    }
    Ok(entry.compressed_size as usize)
}

fn inflate(raw: &[u8], entry: &ZipFileEntry) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(entry.uncompressed_size.min(MAX_PREALLOC) as usize);
    // One byte past the declared size is enough to detect a lying header
    DeflateDecoder::new(raw)
        .take(entry.uncompressed_size.saturating_add(1))
        .read_to_end(&mut data)
        .with_context(|| format!("Cannot inflate {}", entry.file_name))?;
    Ok(data)
}
