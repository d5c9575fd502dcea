//! Frame paths and the per-session frame index.

use crate::driver::Driver;
use crate::Result;
use std::fmt;
use tracing::debug;

/// Picks one frame among the frames of the current document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameSelector {
    /// 0-based position among the document's frames.
    Index(usize),
    Id(String),
    Name(String),
    XPath(String),
}

impl fmt::Display for FrameSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "FRAMEINDEX={}", i + 1),
            Self::Id(id) => write!(f, "FRAMEID={id}"),
            Self::Name(name) => write!(f, "FRAMENAME={name}"),
            Self::XPath(x) => write!(f, "FRAMEXPATH={x}"),
        }
    }
}

/// Route from the top document down to one frame. Empty means the top.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FramePath(Vec<FrameSelector>);

/// The frame a search result was found in.
pub type FrameContext = FramePath;

impl FramePath {
    pub fn top() -> Self {
        Self::default()
    }

    pub fn is_top(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, selector: FrameSelector) {
        self.0.push(selector);
    }

    pub fn child(&self, selector: FrameSelector) -> Self {
        let mut path = self.clone();
        path.push(selector);
        path
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameSelector> {
        self.0.iter()
    }
}

impl From<Vec<FrameSelector>> for FramePath {
    fn from(v: Vec<FrameSelector>) -> Self {
        Self(v)
    }
}

impl fmt::Display for FramePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_top() {
            return f.write_str("top");
        }
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join(crate::locator::SEGMENT_SEPARATOR))
    }
}

/// Identifying attributes of a frame element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub src: Option<String>,
}

/// A frame and its nested frames, as reported by a driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTree {
    pub info: FrameInfo,
    pub children: Vec<FrameTree>,
}

/// One entry of the flattened frame list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNode {
    /// Index path from the top document; its prefixes are the ancestors.
    pub path: FramePath,
    pub info: FrameInfo,
}

impl FrameNode {
    pub fn is_top(&self) -> bool {
        self.path.is_top()
    }
}

/// Pre-order list of every frame in the session, top document first.
///
/// Built on first use and kept until [`invalidate`](Self::invalidate).
#[derive(Debug, Default)]
pub struct FrameIndex {
    nodes: Option<Vec<FrameNode>>,
}

impl FrameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        self.nodes.is_some()
    }

    /// Drop the list; the next call to [`nodes`](Self::nodes) rebuilds it.
    pub fn invalidate(&mut self) {
        if self.nodes.take().is_some() {
            debug!("frame index invalidated");
        }
    }

    /// The flattened frame list, building it from the driver if needed.
    pub async fn nodes<D: Driver>(&mut self, driver: &D) -> Result<Vec<FrameNode>> {
        if let Some(ref nodes) = self.nodes {
            return Ok(nodes.clone());
        }

        let tree = driver.frame_tree().await?;
        let mut nodes = vec![FrameNode {
            path: FramePath::top(),
            info: FrameInfo::default(),
        }];
        flatten(&tree, &FramePath::top(), &mut nodes);
        debug!("frame index built: {} frames", nodes.len() - 1);

        self.nodes = Some(nodes.clone());
        Ok(nodes)
    }

    /// First frame whose id or name equals `key`.
    pub async fn find<D: Driver>(&mut self, driver: &D, key: &str) -> Result<Option<FrameNode>> {
        let nodes = self.nodes(driver).await?;
        Ok(nodes.into_iter().find(|n| {
            !n.is_top()
                && (n.info.id.as_deref() == Some(key) || n.info.name.as_deref() == Some(key))
        }))
    }
}

fn flatten(trees: &[FrameTree], parent: &FramePath, out: &mut Vec<FrameNode>) {
    for (i, tree) in trees.iter().enumerate() {
        let path = parent.child(FrameSelector::Index(i));
        out.push(FrameNode {
            path: path.clone(),
            info: tree.info.clone(),
        });
        flatten(&tree.children, &path, out);
    }
}
