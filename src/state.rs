//! Per-frame state snapshots and the diff used to decide whether a frame is dirty.
//!
//! Every frame each element packs the values that affect its visual output into
//! a [`StateSnapshot`]. Comparing the snapshot with the previous frame's yields a
//! [`StateDiff`]. Values are compared bit for bit, so an element that was not
//! touched always compares equal to itself, NaNs included.
//!
//! Snapshots keep their buffers between frames: `reset` clears lengths but not
//! capacity, so steady-state packing does not allocate.

use std::collections::HashMap;
use std::ops::Range;

use glam::{Mat4, Vec3};

use crate::element::{Element, ElementId, ElementType};

#[derive(Debug, Clone)]
struct Entry {
    id: ElementId,
    kind: ElementType,
    boundable: bool,
    transform: Option<[u32; 16]>,
    words: Range<usize>,
}

/// Ordered mapping from element identity to its packed render state
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    entries: Vec<Entry>,
    index: HashMap<ElementId, usize>,
    words: Vec<u32>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry, keeping allocations for the next frame
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.words.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.index.contains_key(&id)
    }

    /// Variant recorded for `id`, if present
    pub fn kind_of(&self, id: ElementId) -> Option<ElementType> {
        self.index.get(&id).map(|&i| self.entries[i].kind)
    }

    /// Identities in packing order
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Record `element`'s current state. The entry is boundable when the
    /// element currently reports a bound.
    pub fn pack(&mut self, element: &dyn Element) {
        let mut packer = self.begin(element.id(), element.element_type());
        packer.boundable(element.calc_bound().is_some());
        element.pack(&mut packer);
    }

    /// Start a new entry and return a packer writing into it. The entry is
    /// boundable if `kind` is, until [`StatePacker::boundable`] says otherwise.
    ///
    /// # Panics
    /// If `id` was already packed into this snapshot.
    pub fn begin(&mut self, id: ElementId, kind: ElementType) -> StatePacker<'_> {
        let entry = self.entries.len();
        let previous = self.index.insert(id, entry);
        assert!(previous.is_none(), "element {id} packed twice into one snapshot");

        let start = self.words.len();
        self.entries.push(Entry {
            id,
            kind,
            boundable: kind.is_boundable(),
            transform: None,
            words: start..start,
        });
        StatePacker {
            snapshot: self,
            entry,
        }
    }

    /// Diff against the previous frame's snapshot
    pub fn compare(&self, previous: &StateSnapshot) -> StateDiff {
        let mut diff = StateDiff::default();
        self.compare_into(previous, &mut diff);
        diff
    }

    /// Like [`compare`](Self::compare), reusing `diff`'s allocations
    pub fn compare_into(&self, previous: &StateSnapshot, diff: &mut StateDiff) {
        diff.clear();

        for entry in &self.entries {
            let Some(&j) = previous.index.get(&entry.id) else {
                diff.push_added(entry);
                continue;
            };
            let before = &previous.entries[j];
            // an element that gained or lost its bound affects the aggregate either way
            let boundable = entry.boundable || before.boundable;
            if entry.transform != before.transform {
                diff.push_moved(entry, boundable);
            } else if entry.kind != before.kind
                || entry.boundable != before.boundable
                || self.words[entry.words.clone()] != previous.words[before.words.clone()]
            {
                diff.push_changed(entry, boundable);
            }
        }

        for entry in &previous.entries {
            if !self.index.contains_key(&entry.id) {
                diff.push_removed(entry);
            }
        }
    }
}

/// Writes one element's state into a snapshot entry
pub struct StatePacker<'a> {
    snapshot: &'a mut StateSnapshot,
    entry: usize,
}

impl StatePacker<'_> {
    /// Mark whether the element contributes to the aggregate scene bound
    pub fn boundable(&mut self, boundable: bool) {
        self.snapshot.entries[self.entry].boundable = boundable;
    }

    /// Record the element's world transform. Transform changes are reported as
    /// moves, everything else as changes.
    pub fn transform(&mut self, transform: &Mat4) {
        let bits = transform.to_cols_array().map(f32::to_bits);
        self.snapshot.entries[self.entry].transform = Some(bits);
    }

    pub fn u32(&mut self, value: u32) {
        self.snapshot.words.push(value);
        self.snapshot.entries[self.entry].words.end = self.snapshot.words.len();
    }

    pub fn u64(&mut self, value: u64) {
        self.u32(value as u32);
        self.u32((value >> 32) as u32);
    }

    pub fn f32(&mut self, value: f32) {
        self.u32(value.to_bits());
    }

    pub fn bool(&mut self, value: bool) {
        self.u32(value as u32);
    }

    pub fn vec3(&mut self, value: Vec3) {
        self.f32(value.x);
        self.f32(value.y);
        self.f32(value.z);
    }
}

/// Identities that differ between two snapshots, split into disjoint sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDiff {
    pub added: Vec<ElementId>,
    pub removed: Vec<ElementId>,
    pub moved: Vec<ElementId>,
    pub changed: Vec<ElementId>,
    types: u8,
    boundable: bool,
}

impl StateDiff {
    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.moved.clear();
        self.changed.clear();
        self.types = 0;
        self.boundable = false;
    }

    /// True when nothing visible changed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the union of all four sets
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.moved.len() + self.changed.len()
    }

    /// Every identity in the union, added first, then removed, moved, changed
    pub fn all(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.moved)
            .chain(&self.changed)
            .copied()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.all().any(|x| x == id)
    }

    /// Whether an element of type `kind` is in the union
    pub fn contains_type(&self, kind: ElementType) -> bool {
        self.types & kind.bit() != 0
    }

    /// Distinct types in the union, in [`ElementType::ALL`] order
    pub fn types(&self) -> impl Iterator<Item = ElementType> + '_ {
        ElementType::ALL
            .into_iter()
            .filter(|&t| self.contains_type(t))
    }

    /// Whether the union touches anything that feeds the aggregate bound,
    /// in this frame or the previous one
    pub fn contains_boundable(&self) -> bool {
        self.boundable
    }

    fn note(&mut self, kind: ElementType, boundable: bool) {
        self.types |= kind.bit();
        self.boundable |= boundable;
    }

    fn push_added(&mut self, entry: &Entry) {
        self.added.push(entry.id);
        self.note(entry.kind, entry.boundable);
    }

    fn push_removed(&mut self, entry: &Entry) {
        self.removed.push(entry.id);
        self.note(entry.kind, entry.boundable);
    }

    fn push_moved(&mut self, entry: &Entry, boundable: bool) {
        self.moved.push(entry.id);
        self.note(entry.kind, boundable);
    }

    fn push_changed(&mut self, entry: &Entry, boundable: bool) {
        self.changed.push(entry.id);
        self.note(entry.kind, boundable);
    }
}
