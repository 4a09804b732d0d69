//! Low-level ZIP archive parser.
//!
//! ZIP files are read from the end: the End of Central Directory (EOCD)
//! points at the central directory, which lists every entry in the order it
//! was written. Nested archives come from untrusted entry bytes, so every
//! offset and length read from the archive is checked against the size of
//! the source before it is used.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser over any [`ReadAt`] source.
pub struct ZipParser<R: ReadAt + ?Sized> {
    reader: Arc<R>,
    size: u64,
}

impl<R: ReadAt + ?Sized> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record together with its offset in the source.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            bail!("Not a valid ZIP file: {} bytes is too small", self.size);
        }

        // Common case: no archive comment, EOCD is the last 22 bytes
        let offset = self.size - eocd_size;
        let mut buf = [0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;
        if let Ok(eocd) = EndOfCentralDirectory::from_bytes(&buf) {
            if eocd.comment_len == 0 {
                return Ok((eocd, offset));
            }
        }

        // Otherwise scan backwards through the trailing comment window
        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            let eocd = EndOfCentralDirectory::from_bytes(&buf[i..])?;
            if eocd.comment_len as usize == buf.len() - i - EndOfCentralDirectory::SIZE {
                return Ok((eocd, search_start + i as u64));
            }
        }

        bail!("Not a valid ZIP file: End of Central Directory not found")
    }

    /// Resolve the central directory location, following the ZIP64
    /// records when the EOCD fields have overflowed.
    pub async fn central_directory(&self) -> Result<CentralDirectoryLocation> {
        let (eocd, eocd_offset) = self.find_eocd().await?;
        let location = if eocd.is_zip64() {
            self.read_zip64_location(eocd_offset).await?
        } else {
            eocd.location()
        };

        let end = location.offset.checked_add(location.size);
        if end.is_none_or(|end| end > self.size) {
            bail!(
                "Central directory ({} bytes at offset {}) lies outside the archive ({} bytes)",
                location.size,
                location.offset,
                self.size
            );
        }
        Ok(location)
    }

    async fn read_zip64_location(&self, eocd_offset: u64) -> Result<CentralDirectoryLocation> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .context("ZIP64 End of Central Directory Locator is missing")?;
        let mut locator = [0u8; Zip64EOCDLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator).await?;
        let eocd64_offset = Zip64EOCDLocator::eocd64_offset(&locator)?;

        let mut eocd64 = [0u8; Zip64EOCD::MIN_SIZE];
        self.reader.read_exact_at(eocd64_offset, &mut eocd64).await?;
        Zip64EOCD::location(&eocd64)
    }

    /// Read every central directory record, in archive order.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let location = self.central_directory().await?;

        let mut cd_data = vec![0u8; location.size as usize];
        self.reader.read_exact_at(location.offset, &mut cd_data).await?;

        // A lying entry count must not drive a huge allocation
        let capacity = location.entries.min(location.size / CDFH_MIN_SIZE as u64);
        let mut entries = Vec::with_capacity(capacity as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());
        for index in 0..location.entries {
            let entry = parse_cdfh(&mut cursor)
                .with_context(|| format!("Corrupt central directory record #{index}"))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Offset of the first data byte of `entry`, just past its Local File
    /// Header and the variable-length fields that follow it.
    pub async fn data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh = [0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut lfh)
            .await
            .with_context(|| format!("Cannot read local header of {}", entry.file_name))?;
        if &lfh[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header for {}", entry.file_name);
        }

        let mut cursor = Cursor::new(&lfh[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Parse one Central Directory File Header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        bail!("Invalid Central Directory File Header");
    }

    // version made by, version needed, flags
    skip(cursor, 6)?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    // last modification time and date
    skip(cursor, 4)?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    // disk number start, internal and external attributes
    skip(cursor, 8)?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let mut extra_bytes = vec![0u8; extra_field_length as usize];
    cursor.read_exact(&mut extra_bytes)?;
    let mut extra = Cursor::new(extra_bytes.as_slice());
    while (extra.get_ref().len() as u64).saturating_sub(extra.position()) >= 4 {
        let header_id = extra.read_u16::<LittleEndian>()?;
        let field_size = extra.read_u16::<LittleEndian>()? as u64;
        let field_end = extra.position() + field_size;

        if header_id == ZIP64_EXTRA_ID {
            // Values appear only for header fields that overflowed, in this order
            if uncompressed_size == U32_OVERFLOW as u64 && extra.position() + 8 <= field_end {
                uncompressed_size = extra.read_u64::<LittleEndian>()?;
            }
            if compressed_size == U32_OVERFLOW as u64 && extra.position() + 8 <= field_end {
                compressed_size = extra.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == U32_OVERFLOW as u64 && extra.position() + 8 <= field_end {
                lfh_offset = extra.read_u64::<LittleEndian>()?;
            }
        }
        extra.set_position(field_end);
    }

    skip(cursor, file_comment_length as u64)?;

    Ok(ZipFileEntry {
        is_directory: file_name.ends_with('/'),
        file_name,
        compression_method: CompressionMethod::from(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
    })
}

fn skip(cursor: &mut Cursor<&[u8]>, n: u64) -> Result<()> {
    let target = cursor.position() + n;
    if target > cursor.get_ref().len() as u64 {
        bail!("Central directory record is truncated");
    }
    cursor.set_position(target);
    Ok(())
}
