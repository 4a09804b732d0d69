//! Recursive inspection of archives.
//!
//! An [`Inspector`] walks each input archive with a [`TraversalEngine`].
//! Entries whose extension is in the [`ArchiveTypeSet`] are read into memory
//! and opened as archives themselves, down to the configured depth. Every
//! entry met along the way is given to a [`Visitor`]: the [`Lister`] prints
//! it, the [`Extractor`] copies the first one matching a suffix and stops.
//!
//! Entries are named by their virtual path, the `/`-joined chain of entry
//! names leading to them, e.g. `app.ear/lib/core.jar/META-INF/MANIFEST.MF`.

mod archive_types;
mod config;
mod context;
mod engine;
mod inspector;
mod visitor;

pub use archive_types::{ArchiveTypeSet, DEFAULT_ARCHIVE_TYPES};
pub use config::Config;
pub use context::TraversalContext;
pub use engine::TraversalEngine;
pub use inspector::Inspector;
pub use visitor::{Decision, Extractor, Flow, Lister, Visitor};
