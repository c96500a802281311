//! Finding the difference between two fragments.

use crate::fragment::Fragment;
use crate::text;

/// The result of [`Fragment::find_diff_end`]: the rightmost point of
/// difference, expressed as a position in each fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffEnd {
    pub a: usize,
    pub b: usize,
}

/// The first position at which `a` and `b` differ, or `None` when they are
/// identical. Text runs are compared by UTF-16 code unit.
pub(crate) fn find_diff_start(a: &Fragment, b: &Fragment, pos: usize) -> Option<usize> {
    let mut pos = pos;
    let mut i = 0;
    loop {
        if i == a.child_count() || i == b.child_count() {
            return if a.child_count() == b.child_count() {
                None
            } else {
                Some(pos)
            };
        }
        let child_a = a.maybe_child(i)?;
        let child_b = b.maybe_child(i)?;
        if child_a.ptr_eq(child_b) {
            pos += child_a.node_size();
            i += 1;
            continue;
        }

        if !child_a.same_markup(child_b) {
            return Some(pos);
        }

        if child_a.is_text() && child_a.text() != child_b.text() {
            let shared = text::common_prefix(child_a.text_or_empty(), child_b.text_or_empty());
            return Some(pos + shared);
        }
        if child_a.content().size() > 0 || child_b.content().size() > 0 {
            if let Some(inner) = find_diff_start(child_a.content(), child_b.content(), pos + 1) {
                return Some(inner);
            }
        }
        pos += child_a.node_size();
        i += 1;
    }
}

/// The rightmost point at which `a` and `b` differ, or `None` when they are
/// identical. `pos_a` and `pos_b` are the positions just after the two
/// fragments' content.
pub(crate) fn find_diff_end(
    a: &Fragment,
    b: &Fragment,
    pos_a: usize,
    pos_b: usize,
) -> Option<DiffEnd> {
    let mut i_a = a.child_count();
    let mut i_b = b.child_count();
    let mut pos_a = pos_a;
    let mut pos_b = pos_b;
    loop {
        if i_a == 0 || i_b == 0 {
            return if i_a == i_b {
                None
            } else {
                Some(DiffEnd { a: pos_a, b: pos_b })
            };
        }
        i_a -= 1;
        i_b -= 1;
        let child_a = a.maybe_child(i_a)?;
        let child_b = b.maybe_child(i_b)?;
        let size = child_a.node_size();
        if child_a.ptr_eq(child_b) {
            pos_a -= size;
            pos_b -= size;
            continue;
        }

        if !child_a.same_markup(child_b) {
            return Some(DiffEnd { a: pos_a, b: pos_b });
        }

        if child_a.is_text() && child_a.text() != child_b.text() {
            let shared = text::common_suffix(child_a.text_or_empty(), child_b.text_or_empty());
            return Some(DiffEnd {
                a: pos_a - shared,
                b: pos_b - shared,
            });
        }
        if child_a.content().size() > 0 || child_b.content().size() > 0 {
            if let Some(inner) =
                find_diff_end(child_a.content(), child_b.content(), pos_a - 1, pos_b - 1)
            {
                return Some(inner);
            }
        }
        pos_a -= size;
        pos_b -= size;
    }
}
