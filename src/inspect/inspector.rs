use anyhow::{Result, anyhow};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

use super::archive_types::ArchiveTypeSet;
use super::config::Config;
use super::engine::TraversalEngine;
use super::visitor::{Extractor, Lister};

/// Lists or extracts from the configured archives.
pub struct Inspector {
    config: Config,
    archive_types: ArchiveTypeSet,
}

impl Inspector {
    pub fn new(config: Config) -> Self {
        let archive_types = ArchiveTypeSet::new(&config.archive_types);
        Self {
            config,
            archive_types,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn archive_types(&self) -> &ArchiveTypeSet {
        &self.archive_types
    }

    fn engine(&self) -> TraversalEngine<'_> {
        TraversalEngine::new(self.config.max_depth, &self.archive_types)
    }

    /// Write the name of every file entry down to the configured depth.
    pub async fn list<W>(&self, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut lister = Lister::new(&mut *out, self.config.prefix_path);
        let traversed = self.engine().traverse(&self.config.paths, &mut lister).await;
        // Keep what was listed before a failing input
        out.flush().await?;
        traversed
    }

    /// Copy the first entry whose virtual path ends with the configured
    /// target to `out`.
    ///
    /// Returns the virtual path of the extracted entry. Finding nothing is
    /// not an error: the result is `Ok(None)` and nothing is written.
    pub async fn extract<W>(&self, out: &mut W) -> Result<Option<String>>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = self
            .config
            .target()
            .ok_or_else(|| anyhow!("No entry to extract was configured"))?;

        let mut extractor = Extractor::new(target, &mut *out);
        self.engine()
            .traverse(&self.config.paths, &mut extractor)
            .await?;
        Ok(extractor.into_matched())
    }

    /// Extract when a target is configured, list otherwise.
    pub async fn run<W>(&self, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let Some(target) = self.config.target() else {
            return self.list(out).await;
        };

        // TODO: decide whether a missing entry should produce a non-zero exit status
        match self.extract(out).await? {
            Some(path) => info!(entry = %path, "extracted"),
            None => info!(target = %target, "no entry matched"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extract_requires_target() {
        let inspector = Inspector::new(Config {
            paths: vec!["unused.zip".to_string()],
            ..Config::default()
        });
        let mut out = Vec::new();
        assert!(inspector.extract(&mut out).await.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn builds_archive_types_from_config() {
        let inspector = Inspector::new(Config {
            archive_types: vec!["apk".to_string()],
            ..Config::default()
        });
        assert!(inspector.archive_types().contains(".apk"));
        assert!(!inspector.archive_types().contains(".zip"));
    }
}
