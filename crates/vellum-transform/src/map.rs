//! Position mapping.
//!
//! A step changes lengths inside the document; a [`StepMap`] records those
//! changes as `[start, old_size, new_size]` triples so positions in the old
//! document can be carried over to the new one. [`Mapping`] chains several
//! step maps for multi-step rebasing.

use std::fmt;

/// Things positions can be mapped through.
pub trait Mappable {
    /// Map a position. `assoc` (-1 or 1) determines which side the
    /// position associates with when content is inserted at it.
    fn map(&self, pos: usize, assoc: i32) -> usize;

    /// Map a position and report whether it was deleted (entirely enclosed
    /// in a replaced range). When content on only one side is deleted, the
    /// position counts as deleted only when `assoc` points at the deleted
    /// side.
    fn map_result(&self, pos: usize, assoc: i32) -> MapResult;
}

/// A mapped position with deletion information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    pub deleted: bool,
}

/// A map describing the deletions and insertions made by a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<usize>,
    inverted: bool,
}

impl StepMap {
    /// Create a position map from `[start, old_size, new_size]` triples.
    pub fn new(ranges: Vec<usize>) -> StepMap {
        StepMap {
            ranges,
            inverted: false,
        }
    }

    /// The map that changes nothing.
    pub fn empty() -> StepMap {
        StepMap::new(Vec::new())
    }

    /// A map that translates positions in the post-step document back to
    /// the pre-step document.
    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    fn map_inner(&self, pos: usize, assoc: i32) -> MapResult {
        let pos = pos as isize;
        let mut diff: isize = 0;
        let (old_index, new_index) = if self.inverted { (2, 1) } else { (1, 2) };
        let mut i = 0;
        while i + 2 < self.ranges.len() {
            let mut start = self.ranges[i] as isize;
            if self.inverted {
                start -= diff;
            }
            if start > pos {
                break;
            }
            let old_size = self.ranges[i + old_index] as isize;
            let new_size = self.ranges[i + new_index] as isize;
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let mut result = start + diff;
                if side >= 0 {
                    result += new_size;
                }
                let deleted = if assoc < 0 { pos != start } else { pos != end };
                return MapResult {
                    pos: result.max(0) as usize,
                    deleted,
                };
            }
            diff += new_size - old_size;
            i += 3;
        }
        MapResult {
            pos: (pos + diff).max(0) as usize,
            deleted: false,
        }
    }
}

impl Mappable for StepMap {
    fn map(&self, pos: usize, assoc: i32) -> usize {
        self.map_inner(pos, assoc).pos
    }

    fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        self.map_inner(pos, assoc)
    }
}

impl fmt::Display for StepMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "-")?;
        }
        write!(f, "{:?}", self.ranges)
    }
}

/// An ordered collection of step maps, mappable as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
    from: usize,
    to: usize,
}

impl Mapping {
    pub fn new() -> Mapping {
        Mapping::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Mapping {
        let to = maps.len();
        Mapping { maps, from: 0, to }
    }

    /// The step maps in this mapping.
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    /// A mapping that only applies the sub-range `from..to` of this one's
    /// maps.
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        Mapping {
            maps: self.maps.clone(),
            from,
            to,
        }
    }

    /// Add a step map to the end of the mapping.
    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
        self.to = self.maps.len();
    }

    /// Add all the step maps in the given mapping.
    pub fn append_mapping(&mut self, other: &Mapping) {
        for map in &other.maps[other.from..other.to] {
            self.append_map(map.clone());
        }
    }
}

impl Mappable for Mapping {
    fn map(&self, pos: usize, assoc: i32) -> usize {
        let mut pos = pos;
        for map in &self.maps[self.from..self.to] {
            pos = map.map(pos, assoc);
        }
        pos
    }

    fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        let mut pos = pos;
        let mut deleted = false;
        for map in &self.maps[self.from..self.to] {
            let result = map.map_result(pos, assoc);
            pos = result.pos;
            deleted = deleted || result.deleted;
        }
        MapResult { pos, deleted }
    }
}
