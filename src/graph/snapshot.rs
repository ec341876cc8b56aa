use std::collections::{HashMap, HashSet};

use eframe::egui::{Color32, Pos2, Rect};

use super::{EdgeKey, GraphEngine, NodeId, PointerTarget};
use crate::camera::{Projection, ProjectionMode};

pub const NODE_RADIUS: f32 = 8.0;

#[derive(Clone, Debug)]
pub struct RenderNode {
    pub id: NodeId,
    pub label: String,
    pub color: Color32,
    pub screen: Pos2,
    pub radius: f32,
    pub scale: f32,
    pub opacity: f32,
    pub depth: f32,
    pub hovered: bool,
    /// Neighbour of the hovered node.
    pub highlighted: bool,
    /// Label matches the search query.
    pub matched: bool,
}

#[derive(Clone, Debug)]
pub struct RenderEdge {
    pub key: EdgeKey,
    pub from: Pos2,
    pub to: Pos2,
    pub weight: f32,
    pub stroke_width: f32,
    pub opacity: f32,
    pub depth: f32,
    pub hovered: bool,
}

/// One frame of draw-ready data, already in back-to-front order.
#[derive(Clone, Debug)]
pub struct RenderSnapshot {
    pub mode: ProjectionMode,
    pub zoom: f32,
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl RenderSnapshot {
    /// Front-most node whose circle contains `pos`.
    pub fn hit_test(&self, pos: Pos2) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|node| node.screen.distance(pos) <= node.radius.max(4.0))
            .map(|node| node.id)
    }

    /// Classifies a press at `press`; a node under it wins over the canvas.
    pub fn press_target(&self, press: Pos2) -> PointerTarget {
        self.hit_test(press)
            .map_or(PointerTarget::Canvas, PointerTarget::Node)
    }

    pub fn node(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

fn node_radius(mode: ProjectionMode, zoom: f32, projection: &Projection) -> f32 {
    match mode {
        ProjectionMode::Planar => (NODE_RADIUS * zoom.powf(0.40)).clamp(3.0, 30.0),
        ProjectionMode::Volumetric => (NODE_RADIUS * projection.scale).clamp(1.5, 40.0),
    }
}

fn edge_style(weight: f32) -> (f32, f32) {
    let strength = weight.clamp(0.0, 1.0);
    (0.6 + 2.4 * strength, 0.15 + 0.6 * strength)
}

impl GraphEngine {
    /// Projects the current layout into `viewport`.
    pub fn snapshot(&self, viewport: Rect) -> RenderSnapshot {
        let mode = self.camera.mode();
        let zoom = self.camera.zoom();
        let hovered = self.hovered();
        let highlighted = hovered
            .map(|id| {
                self.neighbors(id)
                    .into_iter()
                    .map(|(other, _)| other)
                    .collect::<HashSet<_>>()
            })
            .unwrap_or_default();
        let matches = self.search_matches();

        let positions = self
            .nodes()
            .iter()
            .filter_map(|node| self.simulation.position(node.id).map(|pos| (node, pos)))
            .collect::<Vec<_>>();
        let projections = self
            .camera
            .project_all(positions.iter().map(|(_, pos)| pos), viewport);

        let mut projected_by_id = HashMap::with_capacity(positions.len());
        let mut nodes = Vec::with_capacity(positions.len());
        for ((node, _), projection) in positions.iter().zip(&projections) {
            if !projection.in_front {
                continue;
            }
            projected_by_id.insert(node.id, *projection);
            nodes.push(RenderNode {
                id: node.id,
                label: node.text.clone(),
                color: node.color,
                screen: projection.screen,
                radius: node_radius(mode, zoom, projection),
                scale: projection.scale,
                opacity: projection.opacity,
                depth: projection.depth,
                hovered: hovered == Some(node.id),
                highlighted: highlighted.contains(&node.id),
                matched: matches.contains(&node.id),
            });
        }

        let mut edges = self
            .edges()
            .iter()
            .filter_map(|edge| {
                let from = projected_by_id.get(&edge.key.low)?;
                let to = projected_by_id.get(&edge.key.high)?;
                let (stroke_width, opacity) = edge_style(edge.weight);
                Some(RenderEdge {
                    key: edge.key,
                    from: from.screen,
                    to: to.screen,
                    weight: edge.weight,
                    stroke_width,
                    opacity: opacity * (from.opacity + to.opacity) * 0.5,
                    depth: (from.depth + to.depth) * 0.5,
                    hovered: hovered.is_some_and(|id| edge.key.touches(id)),
                })
            })
            .collect::<Vec<_>>();

        // painter's order; stable sort keeps insertion order between equal depths
        nodes.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        edges.sort_by(|a, b| a.depth.total_cmp(&b.depth));

        RenderSnapshot {
            mode,
            zoom,
            nodes,
            edges,
        }
    }
}
