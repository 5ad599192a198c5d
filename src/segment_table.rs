//! Label appearance table for the segmentation overlay.

use crate::lookup_table::Color;

use std::collections::BTreeMap;

/// Appearance of one segmentation label.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub color: Color,
    /// Blend weight of the label color over the composited base.
    pub opacity: f64,
    pub visible: bool,
}

impl Segment {
    pub fn new(name: impl Into<String>, color: Color, opacity: f64, visible: bool) -> Self {
        Self {
            name: name.into(),
            color,
            opacity: opacity.clamp(0.0, 1.0),
            visible,
        }
    }
}

/// Ordered mapping from label id to appearance.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    entries: BTreeMap<i32, Segment>,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, label: i32, segment: Segment) {
        self.entries.insert(label, segment);
    }

    pub fn remove(&mut self, label: i32) -> Option<Segment> {
        self.entries.remove(&label)
    }

    pub fn get(&self, label: i32) -> Option<&Segment> {
        self.entries.get(&label)
    }

    pub fn get_mut(&mut self, label: i32) -> Option<&mut Segment> {
        self.entries.get_mut(&label)
    }

    pub fn is_valid(&self, label: i32) -> bool {
        self.entries.contains_key(&label)
    }

    pub fn label_name(&self, label: i32) -> Option<&str> {
        self.entries.get(&label).map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &Segment)> {
        self.entries.iter().map(|(&label, segment)| (label, segment))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
