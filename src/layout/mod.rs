//! Force-directed layout over the concept graph.
//!
//! The simulation keeps its own working copy of bodies and links, rebuilt from the engine's
//! canonical collections through [`LayoutSimulation::sync`]. An energy level (`alpha`) scales the
//! charge and link forces; it is raised on every topology change and decays geometrically each
//! tick until the layout settles.

mod forces;

use std::collections::HashMap;

use anyhow::{Result, ensure};
use glam::Vec3;
use serde::Deserialize;

use crate::graph::{ConceptEdge, ConceptNode, NodeId};
use crate::util::stable_triple;
use forces::{Link, PairParams, accumulate_links, accumulate_pairwise, recenter};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub charge_strength: f32,
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub min_link_distance: f32,
    pub centering_strength: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub alpha_reheat: f32,
    pub drag_alpha_floor: f32,
    pub velocity_decay: f32,
    pub max_speed: f32,
    pub min_distance: f32,
    pub seed_jitter: f32,
    pub volume_depth: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            charge_strength: -250.0,
            collision_radius: 30.0,
            collision_strength: 0.7,
            link_distance: 120.0,
            link_strength: 0.7,
            min_link_distance: 12.0,
            centering_strength: 0.03,
            alpha_decay: 0.02,
            alpha_min: 0.001,
            alpha_reheat: 1.0,
            drag_alpha_floor: 0.3,
            velocity_decay: 0.4,
            max_speed: 40.0,
            min_distance: 1.0,
            seed_jitter: 30.0,
            volume_depth: 160.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.alpha_decay > 0.0 && self.alpha_decay < 1.0,
            "alpha_decay must be within (0, 1), got {}",
            self.alpha_decay
        );
        ensure!(
            self.alpha_min > 0.0 && self.alpha_min < self.alpha_reheat,
            "alpha_min must be positive and below alpha_reheat, got {} and {}",
            self.alpha_min,
            self.alpha_reheat
        );
        ensure!(
            (0.0..=1.0).contains(&self.velocity_decay),
            "velocity_decay must be within [0, 1], got {}",
            self.velocity_decay
        );
        ensure!(
            (0.0..=1.0).contains(&self.drag_alpha_floor),
            "drag_alpha_floor must be within [0, 1], got {}",
            self.drag_alpha_floor
        );
        ensure!(
            self.max_speed.is_finite() && self.max_speed > 0.0,
            "max_speed must be positive, got {}",
            self.max_speed
        );
        ensure!(
            self.min_distance.is_finite() && self.min_distance > 0.0,
            "min_distance must be positive, got {}",
            self.min_distance
        );
        ensure!(
            self.link_distance.is_finite() && self.link_distance > 0.0,
            "link_distance must be positive, got {}",
            self.link_distance
        );
        ensure!(
            [
                self.charge_strength,
                self.collision_radius,
                self.collision_strength,
                self.link_strength,
                self.min_link_distance,
                self.centering_strength,
                self.seed_jitter,
                self.volume_depth,
            ]
            .iter()
            .all(|value| value.is_finite()),
            "layout forces must be finite"
        );
        Ok(())
    }

    /// Rest length of a link: more similar pairs sit closer.
    pub fn link_rest_length(&self, weight: f32) -> f32 {
        (self.link_distance * (1.5 - weight)).max(self.min_link_distance)
    }

    /// Spring stiffness of a link; dissimilar pairs never push.
    pub fn link_pull(&self, weight: f32) -> f32 {
        self.link_strength * weight.clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Body {
    pub id: NodeId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub pinned: Option<Vec3>,
}

pub struct LayoutSimulation {
    config: LayoutConfig,
    volumetric: bool,
    bodies: Vec<Body>,
    links: Vec<Link>,
    index_by_id: HashMap<NodeId, usize>,
    alpha: f32,
    alpha_target: f32,
    scratch_positions: Vec<Vec3>,
    scratch_velocities: Vec<Vec3>,
    scratch_free: Vec<bool>,
}

impl LayoutSimulation {
    pub fn new(config: LayoutConfig, volumetric: bool) -> Self {
        Self {
            config,
            volumetric,
            bodies: Vec::new(),
            links: Vec::new(),
            index_by_id: HashMap::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            scratch_positions: Vec::new(),
            scratch_velocities: Vec::new(),
            scratch_free: Vec::new(),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_volumetric(&self) -> bool {
        self.volumetric
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.index_by_id
            .get(&id)
            .map(|&index| self.bodies[index].position)
    }

    pub fn centroid(&self) -> Vec3 {
        if self.bodies.is_empty() {
            return Vec3::ZERO;
        }
        self.bodies.iter().map(|body| body.position).sum::<Vec3>() / self.bodies.len() as f32
    }

    pub fn has_pins(&self) -> bool {
        self.bodies.iter().any(|body| body.pinned.is_some())
    }

    /// Settled once the energy has decayed away and nothing is being held.
    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min && !self.has_pins()
    }

    pub fn reheat(&mut self) {
        self.alpha = self.alpha.max(self.config.alpha_reheat);
    }

    /// Replaces the working copy with the canonical node and edge sets.
    ///
    /// Bodies that survive keep their position and velocity; new bodies are seeded next to the
    /// nodes they link to. Any change in membership or links reheats the simulation.
    pub fn sync(&mut self, nodes: &[ConceptNode], edges: &[ConceptEdge]) {
        let previous = std::mem::take(&mut self.bodies)
            .into_iter()
            .map(|body| (body.id, body))
            .collect::<HashMap<_, _>>();
        let previous_link_count = self.links.len();
        let mut added = Vec::new();

        self.index_by_id.clear();
        for node in nodes {
            self.index_by_id.insert(node.id, self.bodies.len());
            match previous.get(&node.id) {
                Some(body) => self.bodies.push(*body),
                None => {
                    added.push(self.bodies.len());
                    self.bodies.push(Body {
                        id: node.id,
                        position: Vec3::ZERO,
                        velocity: Vec3::ZERO,
                        pinned: None,
                    });
                }
            }
        }

        let mut degree = vec![0usize; self.bodies.len()];
        let mut resolved = Vec::with_capacity(edges.len());
        for edge in edges {
            let (Some(&source), Some(&target)) = (
                self.index_by_id.get(&edge.key.low),
                self.index_by_id.get(&edge.key.high),
            ) else {
                continue;
            };
            if source == target {
                continue;
            }
            degree[source] += 1;
            degree[target] += 1;
            resolved.push((source, target, edge.weight));
        }

        self.links = resolved
            .iter()
            .map(|&(source, target, weight)| Link {
                source,
                target,
                distance: self.config.link_rest_length(weight),
                strength: self.config.link_pull(weight),
                bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
            })
            .collect();

        for &index in &added {
            let seeded = self.seed_position(index, &added);
            self.bodies[index].position = seeded;
        }

        let removed = previous.len() + added.len() != self.bodies.len();
        if !added.is_empty() || removed || previous_link_count != self.links.len() {
            self.reheat();
        }
    }

    fn seed_position(&self, index: usize, unplaced: &[usize]) -> Vec3 {
        let mut anchor = Vec3::ZERO;
        let mut anchors = 0usize;
        for link in &self.links {
            let other = if link.source == index {
                link.target
            } else if link.target == index {
                link.source
            } else {
                continue;
            };
            if unplaced.contains(&other) {
                continue;
            }
            anchor += self.bodies[other].position;
            anchors += 1;
        }
        if anchors > 0 {
            anchor /= anchors as f32;
        }

        let seed = stable_triple(self.bodies[index].id.0);
        let mut jitter = seed * self.config.seed_jitter;
        if self.volumetric {
            jitter.z = seed.z * self.config.volume_depth * 0.5;
        } else {
            jitter.z = 0.0;
            anchor.z = 0.0;
        }
        anchor + jitter
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.links.clear();
        self.index_by_id.clear();
        self.alpha = 0.0;
        self.alpha_target = 0.0;
    }

    /// Switches between planar and volumetric motion and reheats.
    pub fn set_volumetric(&mut self, volumetric: bool) {
        self.volumetric = volumetric;
        let depth = self.config.volume_depth;
        for body in &mut self.bodies {
            if volumetric {
                body.position.z = stable_triple(body.id.0).z * depth;
            } else {
                body.position.z = 0.0;
                body.velocity.z = 0.0;
            }
            if let Some(pin) = body.pinned.as_mut()
                && !volumetric
            {
                pin.z = 0.0;
            }
        }
        self.reheat();
    }

    /// Holds a body at `position` until [`release`](Self::release). Keeps the rest of the graph
    /// reacting while held.
    pub fn pin(&mut self, id: NodeId, mut position: Vec3) -> bool {
        let Some(&index) = self.index_by_id.get(&id) else {
            return false;
        };
        if !self.volumetric {
            position.z = 0.0;
        }
        let body = &mut self.bodies[index];
        body.pinned = Some(position);
        body.position = position;
        body.velocity = Vec3::ZERO;
        self.alpha_target = self.config.drag_alpha_floor;
        self.alpha = self.alpha.max(self.config.drag_alpha_floor);
        true
    }

    pub fn release(&mut self, id: NodeId) -> bool {
        let Some(&index) = self.index_by_id.get(&id) else {
            return false;
        };
        let released = self.bodies[index].pinned.take().is_some();
        if !self.has_pins() {
            self.alpha_target = 0.0;
        }
        released
    }

    /// Advances one frame of `delta_seconds`. Returns `false` without doing anything while
    /// settled.
    pub fn step(&mut self, delta_seconds: f32) -> bool {
        if self.bodies.is_empty() || self.is_settled() {
            return false;
        }
        let time_step_scale = (delta_seconds * 60.0).clamp(0.25, 3.0);
        self.advance(time_step_scale);
        true
    }

    /// One fixed tick, regardless of whether the layout has settled.
    pub fn tick(&mut self) {
        self.advance(1.0);
    }

    fn advance(&mut self, time_step_scale: f32) {
        let config = self.config;
        let decay = 1.0 - (1.0 - config.alpha_decay).powf(time_step_scale);
        self.alpha += (self.alpha_target - self.alpha) * decay;

        let node_count = self.bodies.len();
        if node_count == 0 {
            return;
        }

        self.scratch_positions.clear();
        self.scratch_velocities.clear();
        self.scratch_free.clear();
        for body in &self.bodies {
            self.scratch_positions.push(body.position);
            self.scratch_velocities.push(body.velocity);
            self.scratch_free.push(body.pinned.is_none());
        }

        accumulate_pairwise(
            &self.scratch_positions,
            &mut self.scratch_velocities,
            PairParams {
                charge_strength: config.charge_strength,
                collision_radius: config.collision_radius,
                collision_strength: config.collision_strength,
                min_distance: config.min_distance,
                alpha: self.alpha,
            },
        );
        accumulate_links(
            &self.links,
            &self.scratch_positions,
            &mut self.scratch_velocities,
            self.alpha,
            config.min_distance,
        );

        let retain = 1.0 - config.velocity_decay.clamp(0.0, 1.0);
        let max_speed_sq = config.max_speed * config.max_speed;
        for index in 0..node_count {
            let body = &self.bodies[index];
            if let Some(pin) = body.pinned {
                self.scratch_positions[index] = pin;
                self.scratch_velocities[index] = Vec3::ZERO;
                continue;
            }

            let mut velocity = self.scratch_velocities[index] * retain;
            if !self.volumetric {
                velocity.z = 0.0;
            }
            let speed_sq = velocity.length_squared();
            if speed_sq > max_speed_sq {
                velocity *= config.max_speed / speed_sq.sqrt();
            }
            self.scratch_velocities[index] = velocity;
            self.scratch_positions[index] += velocity * time_step_scale;
        }

        let strength = (config.centering_strength * time_step_scale).clamp(0.0, 1.0);
        recenter(&mut self.scratch_positions, &self.scratch_free, strength);

        for (index, body) in self.bodies.iter_mut().enumerate() {
            let position = self.scratch_positions[index];
            let velocity = self.scratch_velocities[index];
            if position.is_finite() && velocity.is_finite() {
                body.position = position;
                body.velocity = velocity;
            } else {
                log::warn!("layout body {} left finite range; reseeding", body.id);
                body.position = stable_triple(body.id.0) * config.seed_jitter;
                if !self.volumetric {
                    body.position.z = 0.0;
                }
                body.velocity = Vec3::ZERO;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::Color32;

    use super::*;
    use crate::graph::EdgeKey;

    fn node(id: u64) -> ConceptNode {
        ConceptNode {
            id: NodeId(id),
            text: format!("n{id}"),
            key: format!("n{id}"),
            embedding: vec![1.0],
            color: Color32::WHITE,
        }
    }

    fn edge(a: u64, b: u64, weight: f32) -> ConceptEdge {
        ConceptEdge {
            key: EdgeKey::new(NodeId(a), NodeId(b)),
            weight,
        }
    }

    fn chain(count: u64) -> (Vec<ConceptNode>, Vec<ConceptEdge>) {
        let nodes = (1..=count).map(node).collect();
        let edges = (2..=count).map(|id| edge(id - 1, id, 0.6)).collect();
        (nodes, edges)
    }

    #[test]
    fn sync_reheats_and_keeps_existing_positions() {
        let mut simulation = LayoutSimulation::new(LayoutConfig::default(), false);
        let (nodes, edges) = chain(3);
        simulation.sync(&nodes[..2], &edges[..1]);
        assert!(simulation.alpha() >= 1.0);
        for _ in 0..50 {
            simulation.tick();
        }
        let before = simulation.position(NodeId(1));

        simulation.sync(&nodes, &edges);
        assert_eq!(simulation.bodies().len(), 3);
        assert_eq!(simulation.position(NodeId(1)), before);
        assert!(simulation.alpha() >= 1.0);
    }

    #[test]
    fn new_body_is_seeded_near_its_neighbours() {
        let mut simulation = LayoutSimulation::new(LayoutConfig::default(), false);
        let (nodes, edges) = chain(2);
        simulation.sync(&nodes[..1], &[]);
        simulation.pin(NodeId(1), Vec3::new(400.0, -300.0, 0.0));
        simulation.sync(&nodes, &edges);
        let seeded = simulation.position(NodeId(2)).unwrap_or(Vec3::ZERO);
        let anchor = Vec3::new(400.0, -300.0, 0.0);
        assert!((seeded - anchor).length() <= LayoutConfig::default().seed_jitter * 2.0);
    }

    #[test]
    fn alpha_decays_to_settled() {
        let mut simulation = LayoutSimulation::new(LayoutConfig::default(), false);
        let (nodes, edges) = chain(4);
        simulation.sync(&nodes, &edges);
        let mut steps = 0;
        while simulation.step(1.0 / 60.0) {
            steps += 1;
            assert!(steps < 10_000, "simulation never settled");
        }
        assert!(simulation.is_settled());
        assert!(!simulation.step(1.0 / 60.0));
    }

    #[test]
    fn centroid_converges_to_origin() {
        let mut simulation = LayoutSimulation::new(LayoutConfig::default(), false);
        let (nodes, edges) = chain(8);
        simulation.sync(&nodes, &edges);
        for id in 1..=8 {
            simulation.pin(NodeId(id), Vec3::new(600.0 + id as f32 * 25.0, -450.0, 0.0));
        }
        for id in 1..=8 {
            simulation.release(NodeId(id));
        }
        let start = simulation.centroid().length();
        for _ in 0..1_500 {
            simulation.tick();
        }
        let end = simulation.centroid().length();
        assert!(start > 500.0);
        assert!(end < 1.0, "centroid still at {end}");
    }

    #[test]
    fn coincident_bodies_stay_finite() {
        let mut simulation = LayoutSimulation::new(LayoutConfig::default(), true);
        let (nodes, edges) = chain(3);
        simulation.sync(&nodes, &edges);
        for id in 1..=3 {
            simulation.pin(NodeId(id), Vec3::ZERO);
            simulation.release(NodeId(id));
        }
        for _ in 0..300 {
            simulation.tick();
            assert!(
                simulation
                    .bodies()
                    .iter()
                    .all(|body| body.position.is_finite() && body.velocity.is_finite())
            );
        }
        let a = simulation.position(NodeId(1)).unwrap_or(Vec3::ZERO);
        let b = simulation.position(NodeId(2)).unwrap_or(Vec3::ZERO);
        assert!((a - b).length() > 1.0);
    }

    #[test]
    fn pinned_body_holds_and_keeps_graph_warm() {
        let mut simulation = LayoutSimulation::new(LayoutConfig::default(), false);
        let (nodes, edges) = chain(3);
        simulation.sync(&nodes, &edges);
        let target = Vec3::new(80.0, 40.0, 0.0);
        simulation.pin(NodeId(2), target);
        for _ in 0..2_000 {
            simulation.tick();
        }
        assert_eq!(simulation.position(NodeId(2)), Some(target));
        assert!(simulation.alpha() >= 0.29);
        assert!(!simulation.is_settled());

        assert!(simulation.release(NodeId(2)));
        for _ in 0..2_000 {
            simulation.tick();
        }
        assert!(simulation.is_settled());
    }

    #[test]
    fn planar_mode_keeps_depth_flat() {
        let mut simulation = LayoutSimulation::new(LayoutConfig::default(), true);
        let (nodes, edges) = chain(5);
        simulation.sync(&nodes, &edges);
        assert!(simulation.bodies().iter().any(|body| body.position.z != 0.0));

        simulation.set_volumetric(false);
        for _ in 0..100 {
            simulation.tick();
        }
        assert!(simulation.bodies().iter().all(|body| body.position.z == 0.0));
    }

    #[test]
    fn link_rest_length_shrinks_with_similarity() {
        let config = LayoutConfig::default();
        assert!(config.link_rest_length(0.9) < config.link_rest_length(0.2));
        assert!(config.link_rest_length(5.0) >= config.min_link_distance);
        assert_eq!(config.link_pull(-0.5), 0.0);
    }
}
