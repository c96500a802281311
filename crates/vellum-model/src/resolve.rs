//! Position resolution.
//!
//! A bare position is just an integer; resolving it against a document
//! recovers the full ancestor context: which nodes enclose it, at which
//! child indices, and where those ancestors start. The resolved form is
//! only valid against the document it was resolved from.
//!
//! Resolution results are cached in a small process-wide ring keyed by
//! document identity. The cache is purely a performance optimization; a
//! miss falls back to plain resolution.

use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::ModelError;
use crate::mark::Mark;
use crate::node::Node;

/// One level of a resolved position's ancestor path.
#[derive(Clone)]
struct PathLevel {
    /// The ancestor node at this depth.
    node: Node,
    /// The child index the position descends into (or points at).
    index: usize,
    /// The absolute position before that child.
    before: usize,
}

/// A position resolved against a document, carrying its ancestor path.
///
/// Methods taking a `depth` interpret it as an absolute depth; use
/// [`ResolvedPos::resolve_depth`] to translate the relative (negative)
/// convention.
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathLevel>,
    parent_offset: usize,
}

impl ResolvedPos {
    /// The position that was resolved.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The number of levels the parent node is removed from the root.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// The offset this position has into its parent node.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Translate a possibly-negative depth argument: negative values count
    /// down from this position's own depth.
    pub fn resolve_depth(&self, depth: isize) -> usize {
        if depth < 0 {
            self.depth() - depth.unsigned_abs()
        } else {
            depth as usize
        }
    }

    /// The parent node that the position points into. Even when the
    /// position points into a text node, that text node is not the parent;
    /// text nodes are flat.
    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    /// The root node in which the position was resolved.
    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    /// The ancestor node at the given depth.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// The index into the ancestor at the given depth.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// The index pointing after this position, into the ancestor at the
    /// given depth.
    pub fn index_after(&self, depth: usize) -> usize {
        let at_end = depth == self.depth() && self.text_offset() == 0;
        self.index(depth) + if at_end { 0 } else { 1 }
    }

    /// The absolute position at the start of the node at the given depth.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].before + 1
        }
    }

    /// The absolute position at the end of the node at the given depth.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// The absolute position directly before the node at the given depth,
    /// or, when `depth == self.depth() + 1`, the original position.
    pub fn before(&self, depth: usize) -> Result<usize, ModelError> {
        if depth == 0 {
            return Err(ModelError::BeforeTopLevelNode);
        }
        if depth == self.depth() + 1 {
            return Ok(self.pos);
        }
        Ok(self.path[depth - 1].before)
    }

    /// The absolute position directly after the node at the given depth,
    /// or the original position when `depth == self.depth() + 1`.
    pub fn after(&self, depth: usize) -> Result<usize, ModelError> {
        if depth == 0 {
            return Err(ModelError::AfterTopLevelNode);
        }
        if depth == self.depth() + 1 {
            return Ok(self.pos);
        }
        Ok(self.path[depth - 1].before + self.path[depth].node.node_size())
    }

    /// When this position points into a text node, the distance between the
    /// position and the start of that text node. Zero for positions between
    /// nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.path.len() - 1].before
    }

    /// The node directly after the position, if any. When the position
    /// points into a text node, only the part after the position is
    /// returned.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if index == parent.child_count() {
            return None;
        }
        let d_off = self.text_offset();
        let child = parent.maybe_child(index)?;
        if d_off > 0 {
            Some(child.cut_from(d_off))
        } else {
            Some(child.clone())
        }
    }

    /// The node directly before the position, if any.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let d_off = self.text_offset();
        if d_off > 0 {
            return self.parent().maybe_child(index).map(|c| c.cut(0, d_off));
        }
        if index == 0 {
            return None;
        }
        self.parent().maybe_child(index - 1).cloned()
    }

    /// The marks at this position, factoring in the surrounding marks'
    /// `inclusive` property.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());

        if parent.content().size() == 0 {
            return Vec::new();
        }

        // Inside a text node, the text node's own marks apply.
        if self.text_offset() > 0 {
            return parent
                .maybe_child(index)
                .map(|c| c.marks().to_vec())
                .unwrap_or_default();
        }

        let mut main = if index == 0 {
            None
        } else {
            parent.maybe_child(index - 1)
        };
        let mut other = parent.maybe_child(index);
        if main.is_none() {
            std::mem::swap(&mut main, &mut other);
        }
        let main = match main {
            Some(main) => main,
            None => return Vec::new(),
        };

        let mut marks = main.marks().to_vec();
        for mark in main.marks() {
            let inclusive = mark.mark_type().spec().inclusive.unwrap_or(true);
            if !inclusive && other.map_or(true, |o| !mark.is_in_set(o.marks())) {
                marks = mark.remove_from_set(&marks);
            }
        }
        marks
    }

    /// The depth up to which this position and the given (unresolved)
    /// position share ancestors.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }
}

impl std::fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResolvedPos({})", self.pos)
    }
}

/// Resolve `pos` inside `doc` without consulting the cache.
pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, ModelError> {
    if pos > doc.content().size() {
        return Err(ModelError::PositionOutOfRange(pos));
    }
    let mut path = Vec::new();
    let mut start = 0;
    let mut parent_offset = pos;
    let mut node = doc.clone();
    loop {
        let (index, offset) = node.content().find_index(parent_offset)?;
        let rem = parent_offset - offset;
        path.push(PathLevel {
            node: node.clone(),
            index,
            before: start + offset,
        });
        if rem == 0 {
            break;
        }
        let child = node.child(index)?.clone();
        if child.is_text() {
            break;
        }
        parent_offset = rem - 1;
        start += offset + 1;
        node = child;
    }
    Ok(ResolvedPos {
        pos,
        path,
        parent_offset,
    })
}

const CACHE_SIZE: usize = 12;

struct CacheEntry {
    doc: Node,
    rpos: ResolvedPos,
}

struct ResolveCache {
    entries: Vec<Option<CacheEntry>>,
    next: usize,
}

static RESOLVE_CACHE: Lazy<Mutex<ResolveCache>> = Lazy::new(|| {
    Mutex::new(ResolveCache {
        entries: (0..CACHE_SIZE).map(|_| None).collect(),
        next: 0,
    })
});

/// Resolve `pos` inside `doc`, going through the process-wide ring cache.
pub(crate) fn resolve_cached(doc: &Node, pos: usize) -> Result<ResolvedPos, ModelError> {
    let mut cache = match RESOLVE_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    for entry in cache.entries.iter().flatten() {
        if entry.doc.ptr_eq(doc) && entry.rpos.pos() == pos {
            return Ok(entry.rpos.clone());
        }
    }
    let result = resolve(doc, pos)?;
    let next = cache.next;
    cache.entries[next] = Some(CacheEntry {
        doc: doc.clone(),
        rpos: result.clone(),
    });
    cache.next = (next + 1) % CACHE_SIZE;
    Ok(result)
}
