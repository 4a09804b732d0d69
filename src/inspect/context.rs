use crate::zip::ZipContainer;

/// One level of the traversal: an opened container, how deep it sits and
/// the virtual path of the entry it was read from.
///
/// The context owns its container; dropping it when the traversal frame
/// returns releases the container on every exit path.
pub struct TraversalContext {
    pub container: ZipContainer,
    /// 0 for a top-level input
    pub depth: usize,
    /// `/`-joined path of the entry that produced `container`, empty at the
    /// top level
    pub parent_path: String,
}

impl TraversalContext {
    pub fn top_level(container: ZipContainer) -> Self {
        Self {
            container,
            depth: 0,
            parent_path: String::new(),
        }
    }

    /// Virtual path of `name` inside this container.
    pub fn virtual_path(&self, name: &str) -> String {
        join_virtual(&self.parent_path, name)
    }

    /// Context for a container read out of the entry called `name`.
    pub fn child(&self, container: ZipContainer, name: &str) -> Self {
        Self {
            container,
            depth: self.depth + 1,
            parent_path: self.virtual_path(name),
        }
    }
}

fn join_virtual(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
