//! The replace algorithm.
//!
//! Every structural edit goes through [`Node::replace`](crate::Node::replace):
//! given two resolved positions and a slice, it rebuilds the spine of the
//! tree between them, joining open nodes at the seams, merging text runs,
//! and validating every reassembled parent against its content expression.

use thiserror::Error;

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolve::ResolvedPos;
use crate::slice::Slice;

/// Failures detected while replacing a part of a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplaceError {
    #[error("Inserted content deeper than insertion position")]
    InsertTooDeep,
    #[error("Inconsistent open depths")]
    InconsistentOpenDepths,
    #[error("Cannot join {0} onto {1}")]
    CannotJoin(String, String),
    #[error("Invalid content for node {0}")]
    InvalidContent(String),
}

pub(crate) fn replace(
    from: &ResolvedPos,
    to: &ResolvedPos,
    slice: &Slice,
) -> Result<Node, ModelError> {
    if slice.open_start() > from.depth() {
        return Err(ReplaceError::InsertTooDeep.into());
    }
    if from.depth() - slice.open_start() != to.depth() - slice.open_end() {
        return Err(ReplaceError::InconsistentOpenDepths.into());
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(
    from: &ResolvedPos,
    to: &ResolvedPos,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ModelError> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start() {
        // Both endpoints descend through the same child.
        let inner = replace_outer(from, to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content().size() == 0 {
        close(node, replace_two_way(from, to, depth)?)
    } else if slice.open_start() == 0
        && slice.open_end() == 0
        && from.depth() == depth
        && to.depth() == depth
    {
        // Simple, flat case: splice the fragment into the parent.
        let parent = from.parent();
        let content = parent.content();
        let spliced = content
            .cut(0, from.parent_offset())
            .append(slice.content())
            .append(&content.cut(to.parent_offset(), content.size()));
        close(parent, spliced)
    } else {
        let (start, end) = prepare_slice_for_replace(slice, from)?;
        close(node, replace_three_way(from, &start, &end, to, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ModelError> {
    if !sub.node_type().compatible_content(main.node_type()) {
        return Err(ReplaceError::CannotJoin(
            sub.node_type().name().to_string(),
            main.node_type().name().to_string(),
        )
        .into());
    }
    Ok(())
}

fn joinable<'a>(
    before: &'a ResolvedPos,
    after: &ResolvedPos,
    depth: usize,
) -> Result<&'a Node, ModelError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last() {
        if child.is_text() && last.is_text() && child.same_markup(last) {
            let merged = child.with_text(format!("{}{}", last.text_or_empty(), child.text_or_empty()));
            let end = target.len() - 1;
            target[end] = merged;
            return;
        }
    }
    target.push(child);
}

fn add_range(
    start: Option<&ResolvedPos>,
    end: Option<&ResolvedPos>,
    depth: usize,
    target: &mut Vec<Node>,
) -> Result<(), ModelError> {
    let node = match end.or(start) {
        Some(rpos) => rpos.node(depth),
        None => return Ok(()),
    };
    let mut start_index = 0;
    let end_index = match end {
        Some(end) => end.index(depth),
        None => node.child_count(),
    };
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                add_node(after, target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i)?.clone(), target);
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            if let Some(before) = end.node_before() {
                add_node(before, target);
            }
        }
    }
    Ok(())
}

fn close(node: &Node, content: Fragment) -> Result<Node, ModelError> {
    if !node.node_type().valid_content(&content) {
        return Err(ReplaceError::InvalidContent(node.node_type().name().to_string()).into());
    }
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos,
    s_start: &ResolvedPos,
    s_end: &ResolvedPos,
    to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, s_start, depth + 1)?.clone())
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(s_end, to, depth + 1)?.clone())
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content)?;
    match (&open_start, &open_end) {
        (Some(open_start), Some(open_end)) if s_start.index(depth) == s_end.index(depth) => {
            check_join(open_start, open_end)?;
            let inner = replace_three_way(from, s_start, s_end, to, depth + 1)?;
            add_node(close(open_start, inner)?, &mut content);
        }
        _ => {
            if let Some(open_start) = &open_start {
                let inner = replace_two_way(from, s_start, depth + 1)?;
                add_node(close(open_start, inner)?, &mut content);
            }
            add_range(Some(s_start), Some(s_end), depth, &mut content)?;
            if let Some(open_end) = &open_end {
                let inner = replace_two_way(s_end, to, depth + 1)?;
                add_node(close(open_end, inner)?, &mut content);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content)?;
    Ok(Fragment::from_vec(content))
}

fn replace_two_way(
    from: &ResolvedPos,
    to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content)?;
    if from.depth() > depth {
        let node = joinable(from, to, depth + 1)?.clone();
        let inner = replace_two_way(from, to, depth + 1)?;
        add_node(close(&node, inner)?, &mut content);
    }
    add_range(Some(to), None, depth, &mut content)?;
    Ok(Fragment::from_vec(content))
}

fn prepare_slice_for_replace(
    slice: &Slice,
    along: &ResolvedPos,
) -> Result<(ResolvedPos, ResolvedPos), ModelError> {
    let extra = along.depth() - slice.open_start();
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content().clone());
    for i in (0..extra).rev() {
        node = along.node(i).copy(Fragment::from_node(node));
    }
    let start = node.resolve_no_cache(slice.open_start() + extra)?;
    let end = node.resolve_no_cache(node.content().size() - slice.open_end() - extra)?;
    Ok((start, end))
}
