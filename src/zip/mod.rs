//! ZIP container reading.
//!
//! - [`structures`]: the on-disk records (EOCD, ZIP64 records, entries)
//! - [`parser`]: locating and decoding the central directory
//! - [`container`]: an opened archive that hands out entry contents
//!
//! Archives are read from the end: the End of Central Directory record
//! points at the central directory, which lists every entry in the order it
//! was written. That order is the order entries are visited in.
//!
//! STORED and DEFLATE entries are supported, with ZIP64 sizes and offsets.
//! Encryption and multi-disk archives are not.

mod container;
mod parser;
mod structures;

pub use container::ZipContainer;
pub use parser::ZipParser;
pub use structures::{CompressionMethod, ZipFileEntry};
