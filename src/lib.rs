//! # zlook
//!
//! Look inside zip archives, and inside the archives nested within them.
//!
//! Enterprise bundles are often archives of archives: an `.ear` holding
//! `.war`s holding `.jar`s. zlook opens nested archives in memory as it
//! meets them, down to a configurable depth, so their contents can be listed
//! or a single entry extracted without unpacking anything to disk.
//!
//! ## Features
//!
//! - List every entry down to a maximum nesting depth, with full virtual
//!   paths such as `app.ear/web.war/WEB-INF/lib/core.jar/Main.class`
//! - Extract the first entry whose virtual path ends with a given suffix
//! - Configurable set of extensions treated as nested archives
//! - Local files or HTTP/HTTPS URLs (read with Range requests)
//! - STORED and DEFLATE entries, ZIP64 archives
//!
//! ## Example
//!
//! ```no_run
//! use zlook::{Config, Inspector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let inspector = Inspector::new(Config {
//!         max_depth: 2,
//!         paths: vec!["app.ear".to_string()],
//!         ..Config::default()
//!     });
//!
//!     let mut stdout = tokio::io::stdout();
//!     inspector.list(&mut stdout).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod inspect;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use inspect::{ArchiveTypeSet, Config, Inspector};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use crate::zip::{ZipContainer, ZipFileEntry};
