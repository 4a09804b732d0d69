use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::io::is_http_url;

/// Everything an [`Inspector`](super::Inspector) needs to know about a run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deepest nesting level whose entries are visited; 0 means the
    /// top-level archives only
    pub max_depth: usize,
    /// Extensions of entries to open as nested archives; empty means the
    /// defaults
    pub archive_types: Vec<String>,
    /// Print listed entries with their full virtual path instead of indenting
    pub prefix_path: bool,
    /// Suffix of the entry to extract; `None` lists instead
    pub extract_target: Option<String>,
    /// Archives to inspect, in order
    pub paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 1,
            archive_types: Vec::new(),
            prefix_path: true,
            extract_target: None,
            paths: Vec::new(),
        }
    }
}

impl Config {
    /// Check the inputs before anything is opened: there must be at least
    /// one, and local inputs must be existing files. Remote inputs are
    /// checked when they are opened.
    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            bail!("zlook: No files to look at");
        }

        for path in self.paths.iter().filter(|p| !is_http_url(p)) {
            let metadata = Path::new(path)
                .metadata()
                .with_context(|| format!("zlook: cant get file info for {path}"))?;
            if metadata.is_dir() {
                bail!("zlook: {} is a directory not archive", path);
            }
        }
        Ok(())
    }

    /// The configured extraction target, ignoring an empty string.
    pub fn target(&self) -> Option<&str> {
        self.extract_target.as_deref().filter(|t| !t.is_empty())
    }
}
