//! What happens to each entry the traversal reaches.
//!
//! The engine hands every entry to a [`Visitor`] before it decides whether
//! to descend into it. The visitor answers with a [`Decision`]: keep going,
//! or stop the whole traversal.

use anyhow::{Context, Error};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::context::TraversalContext;
use crate::zip::ZipFileEntry;

/// Whether the traversal carries on after an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Unwind every level of the traversal, not just the current container
    Stop,
}

/// A visitor's answer for one entry.
///
/// An error attached to [`Flow::Continue`] is only logged. An error attached
/// to [`Flow::Stop`] fails the traversal.
#[derive(Debug)]
pub struct Decision {
    pub flow: Flow,
    pub error: Option<Error>,
}

impl Decision {
    pub fn proceed() -> Self {
        Self {
            flow: Flow::Continue,
            error: None,
        }
    }

    pub fn stop() -> Self {
        Self {
            flow: Flow::Stop,
            error: None,
        }
    }

    pub fn with_error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }
}

#[async_trait]
pub trait Visitor: Send {
    async fn visit(&mut self, ctx: &TraversalContext, entry: &ZipFileEntry) -> Decision;
}

/// Writes one line per file entry.
///
/// With path prefixing, nested entries are printed with their full virtual
/// path; top-level entries, and every entry when prefixing is off, are
/// printed by name indented two spaces per nesting level.
///
/// After the first failed write the sink is abandoned: that failure is
/// reported once and later entries are skipped silently.
pub struct Lister<W> {
    out: W,
    prefix_path: bool,
    broken: bool,
}

impl<W: AsyncWrite + Unpin + Send> Lister<W> {
    pub fn new(out: W, prefix_path: bool) -> Self {
        Self {
            out,
            prefix_path,
            broken: false,
        }
    }

    fn line(&self, ctx: &TraversalContext, entry: &ZipFileEntry) -> String {
        if self.prefix_path && !ctx.parent_path.is_empty() {
            format!("{}/{}\n", ctx.parent_path, entry.file_name)
        } else {
            format!("{:indent$}{}\n", "", entry.file_name, indent = ctx.depth * 2)
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Visitor for Lister<W> {
    async fn visit(&mut self, ctx: &TraversalContext, entry: &ZipFileEntry) -> Decision {
        if entry.is_directory || self.broken {
            return Decision::proceed();
        }

        let line = self.line(ctx, entry);
        match self.out.write_all(line.as_bytes()).await {
            Ok(()) => Decision::proceed(),
            Err(e) => {
                self.broken = true;
                Decision::proceed().with_error(Error::new(e).context("Cannot write listing"))
            }
        }
    }
}

/// Copies the first entry whose virtual path ends with `target` and stops.
pub struct Extractor<W> {
    target: String,
    out: W,
    matched: Option<String>,
}

impl<W: AsyncWrite + Unpin + Send> Extractor<W> {
    pub fn new(target: impl Into<String>, out: W) -> Self {
        Self {
            target: target.into(),
            out,
            matched: None,
        }
    }

    /// Virtual path of the extracted entry, if any matched.
    pub fn into_matched(self) -> Option<String> {
        self.matched
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Visitor for Extractor<W> {
    async fn visit(&mut self, ctx: &TraversalContext, entry: &ZipFileEntry) -> Decision {
        let path = ctx.virtual_path(&entry.file_name);
        if !path.ends_with(&self.target) {
            return Decision::proceed();
        }

        // A match ends the search whether or not the copy succeeds
        let copied = ctx
            .container
            .copy_entry(entry, &mut self.out)
            .await
            .with_context(|| format!("Cannot copy matching entry {path}"));
        self.matched = Some(path);
        match copied {
            Ok(_) => Decision::stop(),
            Err(e) => Decision::stop().with_error(e),
        }
    }
}
