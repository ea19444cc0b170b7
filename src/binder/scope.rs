//! Ancestor scope for correlated parameter lookup.

use std::sync::Arc;

use crate::catalog::GroupDef;
use crate::types::Row;

/// One enclosing row and the group that produced it.
#[derive(Debug)]
pub struct ScopeFrame {
    group: Arc<GroupDef>,
    row: Arc<Row>,
    parent: Option<Arc<ScopeFrame>>,
}

impl ScopeFrame {
    /// Returns the group of this frame.
    #[must_use]
    pub fn group(&self) -> &Arc<GroupDef> {
        &self.group
    }

    /// Returns the row of this frame.
    #[must_use]
    pub fn row(&self) -> &Arc<Row> {
        &self.row
    }
}

/// Rows enclosing a position in the document, nearest first.
///
/// Frames are shared, so extending a scope for each produced row costs one
/// allocation regardless of depth.
#[derive(Debug, Clone, Default)]
pub struct AncestorScope {
    head: Option<Arc<ScopeFrame>>,
    depth: usize,
}

impl AncestorScope {
    /// Creates an empty scope, used for root groups.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child scope with `row` of `group` as the nearest frame.
    #[must_use]
    pub fn child(&self, group: Arc<GroupDef>, row: Arc<Row>) -> Self {
        AncestorScope {
            head: Some(Arc::new(ScopeFrame {
                group,
                row,
                parent: self.head.clone(),
            })),
            depth: self.depth + 1,
        }
    }

    /// Returns the frame `levels_up` above the nearest one.
    #[must_use]
    pub fn frame(&self, levels_up: usize) -> Option<&ScopeFrame> {
        let mut frame = self.head.as_deref()?;
        for _ in 0..levels_up {
            frame = frame.parent.as_deref()?;
        }
        Some(frame)
    }

    /// Returns the nearest frame.
    #[must_use]
    pub fn nearest(&self) -> Option<&ScopeFrame> {
        self.head.as_deref()
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true if the scope has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns true if any frame belongs to `group`.
    #[must_use]
    pub fn contains_group(&self, group: &str) -> bool {
        self.frames().any(|f| f.group.name() == group)
    }

    /// Returns the group names of all frames, outermost first.
    #[must_use]
    pub fn path(&self) -> Vec<String> {
        let mut path: Vec<String> = self.frames().map(|f| f.group.name().to_string()).collect();
        path.reverse();
        path
    }

    /// Iterates frames from the nearest outwards.
    pub fn frames(&self) -> impl Iterator<Item = &ScopeFrame> {
        std::iter::successors(self.head.as_deref(), |f| f.parent.as_deref())
    }
}
