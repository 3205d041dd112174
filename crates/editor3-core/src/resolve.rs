//! Inline range resolution
//!
//! Turns a block's overlapping, unordered style and entity ranges into an
//! ordered list of disjoint [`Segment`]s that cover the whole text. Each
//! segment carries the styles active over it, sorted by nesting priority,
//! and the entity it belongs to, if any.

use smallvec::SmallVec;

use crate::model::{Block, EntityKey, EntityRange, StyleRange};
use crate::style::InlineStyle;

/// Active styles of a segment, outermost first
pub type StyleSet = SmallVec<[InlineStyle; 4]>;

/// A maximal run of text with one style set and one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Start offset, UTF-16 code units
    pub start: usize,
    /// End offset (exclusive), UTF-16 code units
    pub end: usize,
    pub styles: StyleSet,
    pub entity: Option<EntityKey>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn has_style(&self, style: &InlineStyle) -> bool {
        self.styles.contains(style)
    }
}

/// Resolve the ranges of a block over its own text
pub fn resolve_block(block: &Block) -> Vec<Segment> {
    resolve(
        block.len_utf16(),
        &block.inline_style_ranges,
        &block.entity_ranges,
    )
}

/// Resolve style and entity ranges over a text of `len` UTF-16 code units.
///
/// Ranges past the end are clipped and zero-length ranges are dropped.
/// Where entity ranges overlap, the one starting first keeps the overlap.
pub fn resolve(len: usize, styles: &[StyleRange], entities: &[EntityRange]) -> Vec<Segment> {
    if len == 0 {
        return Vec::new();
    }

    let styles: Vec<(usize, usize, &InlineStyle)> = styles
        .iter()
        .filter_map(|r| clip(r.offset, r.length, len).map(|(s, e)| (s, e, &r.style)))
        .collect();
    let entities = disjoint_entities(entities, len);

    let mut cuts: Vec<usize> = Vec::with_capacity(2 + 2 * (styles.len() + entities.len()));
    cuts.push(0);
    cuts.push(len);
    for &(start, end, _) in &styles {
        cuts.push(start);
        cuts.push(end);
    }
    for &(start, end, _) in &entities {
        cuts.push(start);
        cuts.push(end);
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut segments: Vec<Segment> = Vec::with_capacity(cuts.len());
    for window in cuts.windows(2) {
        let (start, end) = (window[0], window[1]);

        let mut active: StyleSet = styles
            .iter()
            .filter(|(s, e, _)| *s <= start && *e >= end)
            .map(|(_, _, style)| (*style).clone())
            .collect();
        active.sort_by(|a, b| a.priority_cmp(b));
        active.dedup();

        let entity = entities
            .iter()
            .find(|(s, e, _)| *s <= start && *e >= end)
            .map(|(_, _, key)| *key);

        match segments.last_mut() {
            Some(last) if last.styles == active && last.entity == entity => last.end = end,
            _ => segments.push(Segment {
                start,
                end,
                styles: active,
                entity,
            }),
        }
    }

    segments
}

fn clip(offset: usize, length: usize, len: usize) -> Option<(usize, usize)> {
    let end = offset.saturating_add(length).min(len);
    if offset >= end {
        return None;
    }
    if offset.saturating_add(length) > len {
        tracing::trace!(offset, length, len, "clipped range past end of text");
    }
    Some((offset, end))
}

fn disjoint_entities(ranges: &[EntityRange], len: usize) -> Vec<(usize, usize, EntityKey)> {
    let mut clipped: Vec<(usize, usize, EntityKey)> = ranges
        .iter()
        .filter_map(|r| clip(r.offset, r.length, len).map(|(s, e)| (s, e, r.key)))
        .collect();
    clipped.sort_by_key(|&(start, _, _)| start);

    let mut result: Vec<(usize, usize, EntityKey)> = Vec::with_capacity(clipped.len());
    for (start, end, key) in clipped {
        let start = result.last().map_or(start, |&(_, prev_end, _)| start.max(prev_end));
        if start < end {
            result.push((start, end, key));
        }
    }
    result
}
