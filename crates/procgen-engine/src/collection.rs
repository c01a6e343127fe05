//! Decorated object collections
//!
//! A `DecoratedCollection` is what an evaluation pass produces: the canonical
//! list of generated entries in generation order, plus two derived index
//! lists filtered by decoration level. The `view` list feeds previews and the
//! `render` list feeds final output. A threshold of zero or less means
//! "unlimited"; a positive threshold keeps entries whose level is strictly
//! below it.
//!
//! The derived lists are never edited directly; they are extended on
//! `append` and rebuilt whenever a threshold changes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::resources::ResourceHandle;

/// Local transform of a generated entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub position: [f64; 3],
    /// Rotation around the vertical axis, in radians
    pub rotation: f64,
    pub scale: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

impl Placement {
    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Copy moved by `offset`
    pub fn translated(&self, offset: [f64; 3]) -> Self {
        Self {
            position: [
                self.position[0] + offset[0],
                self.position[1] + offset[1],
                self.position[2] + offset[2],
            ],
            ..*self
        }
    }
}

/// One generated sub-object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratedEntry {
    /// Display name used when handing entries back to the host
    pub name: String,
    pub geometry: Option<ResourceHandle>,
    pub material: Option<ResourceHandle>,
    pub placement: Placement,
    /// Depth in the logical generation tree
    pub decoration_level: i32,
    pub size_r: f64,
    pub size_y: f64,
}

impl DecoratedEntry {
    pub fn new(name: impl Into<String>, decoration_level: i32) -> Self {
        Self {
            name: name.into(),
            geometry: None,
            material: None,
            placement: Placement::default(),
            decoration_level,
            size_r: 1.0,
            size_y: 1.0,
        }
    }

    pub fn with_geometry(mut self, geometry: Option<ResourceHandle>) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_material(mut self, material: Option<ResourceHandle>) -> Self {
        self.material = material;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_size(mut self, size_r: f64, size_y: f64) -> Self {
        self.size_r = size_r;
        self.size_y = size_y;
        self
    }
}

/// Entry with its reconstructed parent, ready for a host scene graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportNode {
    /// Index in the canonical list
    pub index: usize,
    /// Canonical index of the parent entry, if any
    pub parent: Option<usize>,
    pub name: String,
    pub decoration_level: i32,
    pub geometry: Option<String>,
    pub material: Option<String>,
    pub placement: Placement,
    pub size_r: f64,
    pub size_y: f64,
}

fn passes(level: i32, threshold: i32) -> bool {
    threshold <= 0 || level < threshold
}

/// Canonical entry list plus level-filtered views
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoratedCollection {
    entries: Vec<DecoratedEntry>,
    view: Vec<usize>,
    render: Vec<usize>,
    view_level: i32,
    rendering_level: i32,
}

impl DecoratedCollection {
    /// Create an empty collection with unlimited thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection with the given thresholds
    pub fn with_levels(view_level: i32, rendering_level: i32) -> Self {
        Self {
            view_level,
            rendering_level,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DecoratedEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&DecoratedEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecoratedEntry> {
        self.entries.iter()
    }

    pub fn view_level(&self) -> i32 {
        self.view_level
    }

    pub fn rendering_level(&self) -> i32 {
        self.rendering_level
    }

    /// Canonical indices of the view list
    pub fn view_indices(&self) -> &[usize] {
        &self.view
    }

    /// Canonical indices of the render list
    pub fn render_indices(&self) -> &[usize] {
        &self.render
    }

    pub fn view_entries(&self) -> impl Iterator<Item = &DecoratedEntry> + '_ {
        self.view.iter().map(move |&i| &self.entries[i])
    }

    pub fn render_entries(&self) -> impl Iterator<Item = &DecoratedEntry> + '_ {
        self.render.iter().map(move |&i| &self.entries[i])
    }

    /// Push an entry and extend the derived lists it qualifies for
    pub fn append(&mut self, entry: DecoratedEntry) {
        let index = self.entries.len();
        if passes(entry.decoration_level, self.view_level) {
            self.view.push(index);
        }
        if passes(entry.decoration_level, self.rendering_level) {
            self.render.push(index);
        }
        self.entries.push(entry);
    }

    /// Change the view threshold and rebuild the view list
    pub fn set_view_level(&mut self, level: i32) {
        self.view_level = level;
        self.view = self.filtered(level);
    }

    /// Change the render threshold and rebuild the render list
    pub fn set_rendering_level(&mut self, level: i32) {
        self.rendering_level = level;
        self.render = self.filtered(level);
    }

    fn filtered(&self, threshold: i32) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| passes(e.decoration_level, threshold))
            .map(|(i, _)| i)
            .collect()
    }

    /// Splice `other[from..=to]` into this collection
    ///
    /// Levels are shifted by `+level_diff` when non-negative and by
    /// `-level_diff` when negative. Bounds are clamped to `other`'s last
    /// index; an empty source or an inverted range merges nothing.
    pub fn merge_collection(
        &mut self,
        other: &DecoratedCollection,
        level_diff: i32,
        from: usize,
        to: usize,
    ) {
        let Some(last) = other.len().checked_sub(1) else {
            return;
        };
        let from = from.min(last);
        let to = to.min(last);
        if from > to {
            return;
        }
        for entry in &other.entries[from..=to] {
            let mut entry = entry.clone();
            if entry.decoration_level >= 0 {
                entry.decoration_level += level_diff;
            } else {
                entry.decoration_level -= level_diff;
            }
            self.append(entry);
        }
    }

    /// Splice every entry of `other`
    pub fn merge_all(&mut self, other: &DecoratedCollection, level_diff: i32) {
        if !other.is_empty() {
            self.merge_collection(other, level_diff, 0, other.len() - 1);
        }
    }

    /// Number of entries per decoration level
    pub fn entry_count_by_level(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.decoration_level).or_insert(0) += 1;
        }
        counts
    }

    /// Parent/child nesting of the canonical list
    pub fn to_flat_export(&self) -> Vec<ExportNode> {
        let all: Vec<usize> = (0..self.entries.len()).collect();
        self.export_indices(&all)
    }

    /// Parent/child nesting of the render list only
    pub fn render_export(&self) -> Vec<ExportNode> {
        self.export_indices(&self.render)
    }

    /// Single pass over level-tagged entries.
    ///
    /// The parent of an entry is the most recent entry still on the stack
    /// with a strictly lower level; entries at the same or a deeper level
    /// are popped first. A level that skips ahead (2 directly under 0)
    /// attaches to whatever ancestor remains.
    fn export_indices(&self, indices: &[usize]) -> Vec<ExportNode> {
        let mut stack: Vec<(usize, i32)> = Vec::new();
        let mut nodes = Vec::with_capacity(indices.len());

        for &index in indices {
            let entry = &self.entries[index];
            let level = entry.decoration_level;
            while let Some(&(_, top_level)) = stack.last() {
                if top_level >= level {
                    stack.pop();
                } else {
                    break;
                }
            }
            let parent = stack.last().map(|&(i, _)| i);
            stack.push((index, level));

            nodes.push(ExportNode {
                index,
                parent,
                name: entry.name.clone(),
                decoration_level: level,
                geometry: entry.geometry.as_ref().map(|g| g.name().to_string()),
                material: entry.material.as_ref().map(|m| m.name().to_string()),
                placement: entry.placement,
                size_r: entry.size_r,
                size_y: entry.size_y,
            });
        }
        nodes
    }
}

impl<'a> IntoIterator for &'a DecoratedCollection {
    type Item = &'a DecoratedEntry;
    type IntoIter = std::slice::Iter<'a, DecoratedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
