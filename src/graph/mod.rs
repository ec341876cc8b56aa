use std::fmt;

use eframe::egui::Color32;

mod engine;
mod interaction;
pub mod similarity;
mod snapshot;
pub mod topology;

pub use engine::{Completion, GraphEngine, PendingConcept, Submission};
pub use interaction::PointerTarget;
pub use snapshot::RenderSnapshot;

/// Cyclic node palette, indexed by creation order.
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

pub fn palette_color(creation_index: usize) -> Color32 {
    PALETTE[creation_index % PALETTE.len()]
}

/// Case-insensitive uniqueness key for a concept label.
pub fn concept_key(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct ConceptNode {
    pub id: NodeId,
    pub text: String,
    pub key: String,
    pub embedding: Vec<f32>,
    pub color: Color32,
}

/// Unordered node pair, stored low id first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub low: NodeId,
    pub high: NodeId,
}

impl EdgeKey {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn touches(self, id: NodeId) -> bool {
        self.low == id || self.high == id
    }

    pub fn other(self, id: NodeId) -> Option<NodeId> {
        if self.low == id {
            Some(self.high)
        } else if self.high == id {
            Some(self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low.0, self.high.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConceptEdge {
    pub key: EdgeKey,
    pub weight: f32,
}
