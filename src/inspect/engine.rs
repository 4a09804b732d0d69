//! Depth-first walk over archives and the archives nested inside them.
//!
//! Entries are visited in pre-order: an entry is handed to the visitor
//! first, then, if it is itself an archive and the depth bound allows, its
//! contents are visited before the next sibling. A visitor asking to stop
//! unwinds every level at once.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::archive_types::ArchiveTypeSet;
use super::context::TraversalContext;
use super::visitor::{Decision, Flow, Visitor};
use crate::io::open_source;
use crate::zip::{ZipContainer, ZipFileEntry};

pub struct TraversalEngine<'a> {
    max_depth: usize,
    archive_types: &'a ArchiveTypeSet,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(max_depth: usize, archive_types: &'a ArchiveTypeSet) -> Self {
        Self {
            max_depth,
            archive_types,
        }
    }

    /// Visit every entry reachable from `paths`, in order.
    ///
    /// An input that cannot be opened as an archive fails the whole
    /// traversal. Entries that fail to open as nested archives are logged
    /// and skipped.
    pub async fn traverse<V>(&self, paths: &[String], visitor: &mut V) -> Result<()>
    where
        V: Visitor + ?Sized,
    {
        for path in paths {
            let container = open_top_level(path)
                .await
                .with_context(|| format!("Cannot read {path}"))?;
            debug!(path = %path, entries = container.entries().len(), "opened archive");

            let flow = self
                .descend(TraversalContext::top_level(container), &mut *visitor)
                .await?;
            if flow == Flow::Stop {
                debug!(path = %path, "traversal stopped by visitor");
                break;
            }
        }
        Ok(())
    }

    async fn descend<V>(&self, ctx: TraversalContext, visitor: &mut V) -> Result<Flow>
    where
        V: Visitor + ?Sized,
    {
        if ctx.depth > self.max_depth {
            return Ok(Flow::Continue);
        }

        for entry in ctx.container.entries() {
            let Decision { flow, error } = visitor.visit(&ctx, entry).await;
            if flow == Flow::Stop {
                return match error {
                    Some(error) => Err(error),
                    None => Ok(Flow::Stop),
                };
            }
            if let Some(error) = error {
                let reason = format!("{error:#}");
                warn!(entry = %ctx.virtual_path(&entry.file_name), error = %reason, "visitor error");
            }

            if !self.archive_types.is_archive(entry) || ctx.depth + 1 > self.max_depth {
                continue;
            }

            let child = match open_nested(&ctx, entry).await {
                Ok(child) => child,
                Err(error) => {
                    let reason = format!("{error:#}");
                    warn!(entry = %ctx.virtual_path(&entry.file_name), error = %reason, "skipping nested archive");
                    continue;
                }
            };
            debug!(path = %child.parent_path, depth = child.depth, "descending into nested archive");

            if Box::pin(self.descend(child, &mut *visitor)).await? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }

        Ok(Flow::Continue)
    }
}

async fn open_top_level(path: &str) -> Result<ZipContainer> {
    let source = open_source(path).await?;
    ZipContainer::open(source).await
}

/// Materialize `entry` in memory and open it as an archive.
async fn open_nested(ctx: &TraversalContext, entry: &ZipFileEntry) -> Result<TraversalContext> {
    let bytes = ctx
        .container
        .read_entry(entry)
        .await
        .context("Error reading entry")?;
    let container = ZipContainer::from_bytes(bytes)
        .await
        .context("Entry is not a readable archive")?;
    Ok(ctx.child(container, &entry.file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::io::{Cursor, Write};
    use ::zip::write::SimpleFileOptions;

    enum Node<'a> {
        File(&'a str, &'a str),
        Archive(&'a str, Vec<Node<'a>>),
    }

    fn build(nodes: &[Node<'_>]) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        for node in nodes {
            let (name, data) = match node {
                Node::File(name, data) => (*name, data.as_bytes().to_vec()),
                Node::Archive(name, children) => (*name, build(children)),
            };
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(&data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Records the virtual path and depth of every visited entry.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<(String, usize)>,
        stop_at: Option<&'static str>,
        fail_at: Option<&'static str>,
    }

    #[async_trait]
    impl Visitor for Recorder {
        async fn visit(&mut self, ctx: &TraversalContext, entry: &ZipFileEntry) -> Decision {
            let path = ctx.virtual_path(&entry.file_name);
            let stop = self.stop_at == Some(path.as_str());
            let fail = self.fail_at == Some(path.as_str());
            self.seen.push((path, ctx.depth));
            let decision = if stop { Decision::stop() } else { Decision::proceed() };
            if fail {
                decision.with_error(anyhow!("sink rejected the entry"))
            } else {
                decision
            }
        }
    }

    async fn walk(bytes: Vec<u8>, max_depth: usize, recorder: &mut Recorder) -> Result<()> {
        let types = ArchiveTypeSet::default();
        let engine = TraversalEngine::new(max_depth, &types);
        let ctx = TraversalContext::top_level(ZipContainer::from_bytes(bytes).await?);
        engine.descend(ctx, recorder).await.map(|_| ())
    }

    fn tree() -> Vec<u8> {
        build(&[
            Node::File("a.txt", "a"),
            Node::Archive(
                "one.zip",
                vec![
                    Node::Archive("two.jar", vec![Node::File("deep.txt", "deep")]),
                    Node::File("b.txt", "b"),
                ],
            ),
            Node::File("c.txt", "c"),
        ])
    }

    #[tokio::test]
    async fn visits_in_pre_order() {
        let mut recorder = Recorder::default();
        walk(tree(), 5, &mut recorder).await.unwrap();
        assert_eq!(
            recorder.seen,
            [
                ("a.txt".to_string(), 0),
                ("one.zip".to_string(), 0),
                ("one.zip/two.jar".to_string(), 1),
                ("one.zip/two.jar/deep.txt".to_string(), 2),
                ("one.zip/b.txt".to_string(), 1),
                ("c.txt".to_string(), 0),
            ]
        );
    }

    #[tokio::test]
    async fn depth_bound_limits_descent() {
        for (max_depth, expected) in [(0, 3), (1, 5), (2, 6)] {
            let mut recorder = Recorder::default();
            walk(tree(), max_depth, &mut recorder).await.unwrap();
            assert_eq!(recorder.seen.len(), expected, "max_depth {max_depth}");
            assert!(recorder.seen.iter().all(|(_, depth)| *depth <= max_depth));
        }
    }

    #[tokio::test]
    async fn stop_unwinds_every_level() {
        let mut recorder = Recorder {
            stop_at: Some("one.zip/two.jar/deep.txt"),
            ..Recorder::default()
        };
        walk(tree(), 5, &mut recorder).await.unwrap();
        let last = recorder.seen.last().map(|(path, _)| path.as_str());
        assert_eq!(last, Some("one.zip/two.jar/deep.txt"));
        assert_eq!(recorder.seen.len(), 4);
    }

    #[tokio::test]
    async fn corrupt_nested_archive_is_skipped() {
        let bytes = build(&[
            Node::File("broken.zip", "not really a zip"),
            Node::File("after.txt", "after"),
        ]);
        let mut recorder = Recorder::default();
        walk(bytes, 3, &mut recorder).await.unwrap();
        let paths: Vec<_> = recorder.seen.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, ["broken.zip", "after.txt"]);
    }

    #[tokio::test]
    async fn context_deeper_than_bound_is_not_visited() {
        let types = ArchiveTypeSet::default();
        let engine = TraversalEngine::new(1, &types);
        let container = ZipContainer::from_bytes(build(&[Node::File("x.txt", "x")]))
            .await
            .unwrap();
        let ctx = TraversalContext {
            container,
            depth: 2,
            parent_path: "a.zip/b.zip".to_string(),
        };

        let mut recorder = Recorder::default();
        let flow = engine.descend(ctx, &mut recorder).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(recorder.seen.is_empty());
    }

    #[tokio::test]
    async fn missing_input_names_the_path() {
        let types = ArchiveTypeSet::default();
        let engine = TraversalEngine::new(1, &types);
        let mut recorder = Recorder::default();
        let err = engine
            .traverse(&["/nonexistent/input.zip".to_string()], &mut recorder)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot read /nonexistent/input.zip");
    }

    #[tokio::test]
    async fn error_with_continue_does_not_stop() {
        let types = ArchiveTypeSet::default();
        let engine = TraversalEngine::new(5, &types);
        let ctx = TraversalContext::top_level(ZipContainer::from_bytes(tree()).await.unwrap());
        let mut recorder = Recorder {
            fail_at: Some("one.zip"),
            ..Recorder::default()
        };

        let flow = engine.descend(ctx, &mut recorder).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        let paths: Vec<_> = recorder.seen.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            [
                "a.txt",
                "one.zip",
                "one.zip/two.jar",
                "one.zip/two.jar/deep.txt",
                "one.zip/b.txt",
                "c.txt",
            ]
        );
    }

    #[tokio::test]
    async fn error_with_stop_fails_the_traversal() {
        let mut recorder = Recorder {
            stop_at: Some("one.zip/b.txt"),
            fail_at: Some("one.zip/b.txt"),
            ..Recorder::default()
        };
        let err = walk(tree(), 5, &mut recorder).await.unwrap_err();
        assert_eq!(err.to_string(), "sink rejected the entry");
        assert_eq!(recorder.seen.last().map(|(p, _)| p.as_str()), Some("one.zip/b.txt"));
        assert_eq!(recorder.seen.len(), 5);
    }
}
