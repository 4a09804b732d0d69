//! On-disk ZIP records.
//!
//! Only the fields needed to locate the central directory and the data of
//! each entry are kept; everything else is skipped while parsing.

use byteorder::{ByteOrder, LittleEndian};

use anyhow::{Result, bail};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// Value marking a 16-bit field as overflowed into ZIP64
const U16_OVERFLOW: u16 = 0xFFFF;
/// Value marking a 32-bit field as overflowed into ZIP64
pub const U32_OVERFLOW: u32 = 0xFFFF_FFFF;

/// Where the central directory lives and how many records it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryLocation {
    pub offset: u64,
    pub size: u64,
    pub entries: u64,
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        Ok(Self {
            disk_entries: LittleEndian::read_u16(&data[8..10]),
            total_entries: LittleEndian::read_u16(&data[10..12]),
            cd_size: LittleEndian::read_u32(&data[12..16]),
            cd_offset: LittleEndian::read_u32(&data[16..20]),
            comment_len: LittleEndian::read_u16(&data[20..22]),
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == U16_OVERFLOW
            || self.total_entries == U16_OVERFLOW
            || self.cd_size == U32_OVERFLOW
            || self.cd_offset == U32_OVERFLOW
    }

    pub fn location(&self) -> CentralDirectoryLocation {
        CentralDirectoryLocation {
            offset: self.cd_offset as u64,
            size: self.cd_size as u64,
            entries: self.total_entries as u64,
        }
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator;

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    /// Offset of the ZIP64 EOCD record
    pub fn eocd64_offset(data: &[u8]) -> Result<u64> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 End of Central Directory Locator");
        }
        Ok(LittleEndian::read_u64(&data[8..16]))
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD;

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn location(data: &[u8]) -> Result<CentralDirectoryLocation> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 End of Central Directory");
        }
        Ok(CentralDirectoryLocation {
            entries: LittleEndian::read_u64(&data[32..40]),
            size: LittleEndian::read_u64(&data[40..48]),
            offset: LittleEndian::read_u64(&data[48..56]),
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// ZIP64 extended information extra field
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// One entry of a ZIP archive, as described by its central directory record
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    /// Directory markers end with '/' and carry no data
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Extension of the entry name including the leading dot.
    ///
    /// Only the last path component is considered, so `a.d/file` has no
    /// extension.
    pub fn extension(&self) -> Option<&str> {
        let dot = self.file_name.rfind('.')?;
        let ext = &self.file_name[dot..];
        if ext.contains('/') { None } else { Some(ext) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ZipFileEntry {
        ZipFileEntry {
            file_name: name.to_string(),
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: 0,
            is_directory: name.ends_with('/'),
        }
    }

    #[test]
    fn extension_of_last_component() {
        assert_eq!(entry("lib/app.jar").extension(), Some(".jar"));
        assert_eq!(entry("archive.tar.zip").extension(), Some(".zip"));
        assert_eq!(entry("README").extension(), None);
        assert_eq!(entry("conf.d/README").extension(), None);
        assert_eq!(entry("nested.zip/").extension(), None);
    }

    #[test]
    fn eocd_requires_signature() {
        let mut raw = [0u8; EndOfCentralDirectory::SIZE];
        assert!(EndOfCentralDirectory::from_bytes(&raw).is_err());

        raw[0..4].copy_from_slice(EndOfCentralDirectory::SIGNATURE);
        raw[10] = 3;
        raw[12] = 0x90;
        raw[16] = 0x40;
        let eocd = EndOfCentralDirectory::from_bytes(&raw).unwrap();
        assert!(!eocd.is_zip64());
        assert_eq!(
            eocd.location(),
            CentralDirectoryLocation {
                offset: 0x40,
                size: 0x90,
                entries: 3
            }
        );
    }
}
