use std::collections::{HashMap, HashSet};

use anyhow::Result;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::interaction::Gesture;
use super::topology::{TopologyConfig, connect};
use super::{ConceptEdge, ConceptNode, EdgeKey, NodeId, concept_key, palette_color};
use crate::camera::{Camera, CameraConfig, ProjectionMode};
use crate::embed::prepare_embedding;
use crate::layout::{LayoutConfig, LayoutSimulation};

/// An add request waiting on the embedding provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingConcept {
    pub text: String,
    pub key: String,
    /// Graph generation at submission; a result from an older generation is dropped.
    pub generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    Empty,
    Duplicate,
    AlreadyPending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Pending(PendingConcept),
    Ignored(IgnoreReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Inserted(NodeId),
    Duplicate,
    /// The graph was cleared while the request was in flight.
    Discarded,
    Failed(String),
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Owns the canonical node and edge collections and everything derived from them.
pub struct GraphEngine {
    topology: TopologyConfig,
    nodes: Vec<ConceptNode>,
    edges: Vec<ConceptEdge>,
    index_by_id: HashMap<NodeId, usize>,
    id_by_key: HashMap<String, NodeId>,
    pending: HashSet<String>,
    next_id: u64,
    generation: u64,
    dimension: Option<usize>,
    pub(super) simulation: LayoutSimulation,
    pub(super) camera: Camera,
    pub(super) gesture: Gesture,
    pub(super) zoom_to_pointer: bool,
    hovered: Option<NodeId>,
    search: String,
    last_error: Option<String>,
}

impl GraphEngine {
    pub fn new(
        topology: TopologyConfig,
        layout: LayoutConfig,
        camera: CameraConfig,
        mode: ProjectionMode,
        zoom_to_pointer: bool,
    ) -> Self {
        Self {
            topology,
            nodes: Vec::new(),
            edges: Vec::new(),
            index_by_id: HashMap::new(),
            id_by_key: HashMap::new(),
            pending: HashSet::new(),
            next_id: 1,
            generation: 0,
            dimension: None,
            simulation: LayoutSimulation::new(layout, mode == ProjectionMode::Volumetric),
            camera: Camera::new(camera, mode),
            gesture: Gesture::Idle,
            zoom_to_pointer,
            hovered: None,
            search: String::new(),
            last_error: None,
        }
    }

    pub fn nodes(&self) -> &[ConceptNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ConceptEdge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&ConceptNode> {
        self.index_by_id.get(&id).map(|&index| &self.nodes[index])
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn simulation(&self) -> &LayoutSimulation {
        &self.simulation
    }

    pub fn mode(&self) -> ProjectionMode {
        self.camera.mode()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Records a failure that happened outside of a single request.
    pub fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.last_error = Some(message);
    }

    /// Starts an add. The returned request must be embedded and handed back to
    /// [`complete`](Self::complete).
    pub fn submit(&mut self, text: &str) -> Submission {
        let text = text.trim();
        if text.is_empty() {
            return Submission::Ignored(IgnoreReason::Empty);
        }

        let key = concept_key(text);
        if self.id_by_key.contains_key(&key) {
            log::debug!("ignoring duplicate concept {text:?}");
            return Submission::Ignored(IgnoreReason::Duplicate);
        }
        if !self.pending.insert(key.clone()) {
            return Submission::Ignored(IgnoreReason::AlreadyPending);
        }

        log::info!("embedding concept {text:?}");
        Submission::Pending(PendingConcept {
            text: text.to_owned(),
            key,
            generation: self.generation,
        })
    }

    /// Finishes an add with the provider's answer.
    pub fn complete(&mut self, pending: PendingConcept, result: Result<Vec<f32>>) -> Completion {
        if pending.generation != self.generation {
            log::debug!("discarding stale embedding for {:?}", pending.text);
            return Completion::Discarded;
        }
        self.pending.remove(&pending.key);

        let embedding = match result.and_then(|values| prepare_embedding(values, self.dimension)) {
            Ok(embedding) => embedding,
            Err(error) => {
                let message = format!("Could not add \"{}\": {error:#}", pending.text);
                self.report_error(message.clone());
                return Completion::Failed(message);
            }
        };

        if self.id_by_key.contains_key(&pending.key) {
            return Completion::Duplicate;
        }

        let id = self.insert(pending.text, pending.key, embedding);
        self.last_error = None;
        Completion::Inserted(id)
    }

    /// Abandons every in-flight request, e.g. after the provider went away.
    pub fn fail_pending(&mut self, message: impl Into<String>) {
        self.pending.clear();
        self.report_error(message);
    }

    fn insert(&mut self, text: String, key: String, embedding: Vec<f32>) -> NodeId {
        let links = connect(
            &embedding,
            self.nodes
                .iter()
                .map(|node| (node.id, node.embedding.as_slice())),
            self.topology,
        );

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.dimension.get_or_insert(embedding.len());

        log::info!("added concept {id} {text:?} with {} edges", links.len());

        self.index_by_id.insert(id, self.nodes.len());
        self.id_by_key.insert(key.clone(), id);
        self.nodes.push(ConceptNode {
            id,
            color: palette_color(self.nodes.len()),
            text,
            key,
            embedding,
        });
        self.edges
            .extend(links.into_iter().map(|(other, weight)| ConceptEdge {
                key: EdgeKey::new(id, other),
                weight,
            }));

        self.simulation.sync(&self.nodes, &self.edges);
        id
    }

    /// Drops every node, edge and in-flight request and returns the camera to neutral.
    pub fn clear_all(&mut self) {
        log::info!(
            "clearing {} concepts and {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        self.nodes.clear();
        self.edges.clear();
        self.index_by_id.clear();
        self.id_by_key.clear();
        self.pending.clear();
        self.generation = self.generation.wrapping_add(1);
        self.dimension = None;
        self.simulation.clear();
        self.simulation.sync(&self.nodes, &self.edges);
        self.camera.reset();
        self.gesture = Gesture::Idle;
        self.hovered = None;
        self.search.clear();
        self.last_error = None;
    }

    pub fn set_mode(&mut self, mode: ProjectionMode) {
        if mode == self.camera.mode() {
            return;
        }
        log::info!("switching to {} projection", mode.label());
        self.end_gesture();
        self.camera.set_mode(mode);
        self.simulation
            .set_volumetric(mode == ProjectionMode::Volumetric);
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
    }

    /// Advances the layout by one frame. Returns whether anything moved.
    pub fn step(&mut self, delta_seconds: f32) -> bool {
        self.simulation.step(delta_seconds)
    }

    /// Edges incident to `id` as `(neighbour, weight)`, strongest first.
    pub fn neighbors(&self, id: NodeId) -> Vec<(NodeId, f32)> {
        let mut neighbors = self
            .edges
            .iter()
            .filter_map(|edge| edge.key.other(id).map(|other| (other, edge.weight)))
            .collect::<Vec<_>>();
        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1));
        neighbors
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn set_hovered(&mut self, id: Option<NodeId>) {
        self.hovered = id.filter(|id| self.index_by_id.contains_key(id));
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        query.clone_into(&mut self.search);
    }

    /// Nodes whose label fuzzy-matches the current search query.
    pub fn search_matches(&self) -> HashSet<NodeId> {
        let query = self.search.trim();
        if query.is_empty() {
            return HashSet::new();
        }
        let matcher = SkimMatcherV2::default();
        self.nodes
            .iter()
            .filter(|node| fuzzy_match_score(&matcher, &node.text, query).is_some())
            .map(|node| node.id)
            .collect()
    }
}

#[cfg(test)]
pub(super) mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::graph::PALETTE;
    use crate::graph::similarity::similarity;

    pub(in crate::graph) fn engine(mode: ProjectionMode) -> GraphEngine {
        GraphEngine::new(
            TopologyConfig::default(),
            LayoutConfig::default(),
            CameraConfig::default(),
            mode,
            false,
        )
    }

    fn pending(submission: Submission) -> PendingConcept {
        match submission {
            Submission::Pending(pending) => pending,
            Submission::Ignored(reason) => panic!("submission ignored: {reason:?}"),
        }
    }

    pub(in crate::graph) fn add(engine: &mut GraphEngine, text: &str, vector: Vec<f32>) -> NodeId {
        let request = pending(engine.submit(text));
        match engine.complete(request, Ok(vector)) {
            Completion::Inserted(id) => id,
            other => panic!("unexpected completion {other:?}"),
        }
    }

    /// cat, dog (0.7 to cat) and car (0.1 to both).
    fn animals() -> [Vec<f32>; 3] {
        let cat = vec![1.0, 0.0, 0.0];
        let dog_y = (1.0_f32 - 0.49).sqrt();
        let dog = vec![0.7, dog_y, 0.0];
        let car_y = (0.1 - 0.07) / dog_y;
        let car_z = (1.0 - 0.01 - car_y * car_y).sqrt();
        let car = vec![0.1, car_y, car_z];
        [cat, dog, car]
    }

    #[test]
    fn scenario_cat_dog_car() {
        let [cat, dog, car] = animals();
        assert!((similarity(&dog, &car) - 0.1).abs() < 1e-5);

        let mut engine = engine(ProjectionMode::Planar);
        let cat_id = add(&mut engine, "cat", cat);
        assert_eq!(engine.nodes().len(), 1);
        assert!(engine.edges().is_empty());

        let dog_id = add(&mut engine, "dog", dog);
        assert_eq!(engine.nodes().len(), 2);
        assert_eq!(engine.edges().len(), 1);
        assert_eq!(engine.edges()[0].key, EdgeKey::new(cat_id, dog_id));
        assert!((engine.edges()[0].weight - 0.7).abs() < 1e-4);

        let car_id = add(&mut engine, "car", car);
        assert_eq!(engine.nodes().len(), 3);
        assert_eq!(engine.edges().len(), 3);
        let car_edges = engine.neighbors(car_id);
        assert_eq!(car_edges.len(), 2);
        assert!(car_edges.iter().all(|(_, weight)| (weight - 0.1).abs() < 1e-4));
        assert_eq!(engine.simulation().bodies().len(), 3);
    }

    #[test]
    fn clear_during_pending_discards_result() {
        let mut engine = engine(ProjectionMode::Planar);
        let request = pending(engine.submit("whale"));
        assert!(engine.is_pending());

        engine.clear_all();
        assert!(!engine.is_pending());

        let outcome = engine.complete(request, Ok(vec![0.0, 1.0]));
        assert_eq!(outcome, Completion::Discarded);
        assert!(engine.nodes().is_empty());
        assert!(engine.edges().is_empty());
        assert!(engine.simulation().bodies().is_empty());
    }

    #[test]
    fn duplicates_are_ignored_case_insensitively() {
        let mut engine = engine(ProjectionMode::Planar);
        add(&mut engine, "Cat", vec![1.0, 0.0]);
        add(&mut engine, "dog", vec![0.0, 1.0]);
        assert_eq!(
            engine.submit("  cAT "),
            Submission::Ignored(IgnoreReason::Duplicate)
        );
        assert_eq!(engine.nodes().len(), 2);
        assert_eq!(engine.edges().len(), 1);
        assert!(!engine.is_pending());
    }

    #[test]
    fn same_text_cannot_be_pending_twice() {
        let mut engine = engine(ProjectionMode::Planar);
        let first = pending(engine.submit("owl"));
        assert_eq!(
            engine.submit("OWL"),
            Submission::Ignored(IgnoreReason::AlreadyPending)
        );
        assert_eq!(engine.submit("   "), Submission::Ignored(IgnoreReason::Empty));
        assert_eq!(engine.pending_count(), 1);
        assert!(matches!(
            engine.complete(first, Ok(vec![1.0, 1.0])),
            Completion::Inserted(_)
        ));
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn provider_failure_leaves_graph_untouched() {
        let mut engine = engine(ProjectionMode::Planar);
        add(&mut engine, "cat", vec![1.0, 0.0]);
        let request = pending(engine.submit("dog"));
        let outcome = engine.complete(request, Err(anyhow!("network down")));
        let Completion::Failed(message) = outcome else {
            panic!("expected failure");
        };
        assert!(message.contains("network down"));
        assert_eq!(engine.last_error(), Some(message.as_str()));
        assert_eq!(engine.nodes().len(), 1);
        assert!(engine.edges().is_empty());
        assert!(!engine.is_pending());

        add(&mut engine, "dog", vec![0.6, 0.8]);
        assert_eq!(engine.nodes().len(), 2);
        assert!(engine.last_error().is_none());
    }

    #[test]
    fn wrong_dimension_is_a_provider_failure() {
        let mut engine = engine(ProjectionMode::Planar);
        add(&mut engine, "cat", vec![1.0, 0.0, 0.0]);
        let request = pending(engine.submit("dog"));
        assert!(matches!(
            engine.complete(request, Ok(vec![1.0, 0.0])),
            Completion::Failed(_)
        ));
        assert_eq!(engine.nodes().len(), 1);
        assert_eq!(engine.dimension(), Some(3));
    }

    #[test]
    fn stored_embeddings_are_unit_length() {
        let mut engine = engine(ProjectionMode::Planar);
        let id = add(&mut engine, "cat", vec![3.0, 4.0]);
        let node = engine.node(id).expect("node");
        assert!((similarity(&node.embedding, &node.embedding) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn colors_follow_creation_order() {
        let mut engine = engine(ProjectionMode::Planar);
        for index in 0..12 {
            add(&mut engine, &format!("concept {index}"), vec![1.0, index as f32]);
        }
        for (index, node) in engine.nodes().iter().enumerate() {
            assert_eq!(node.color, PALETTE[index % PALETTE.len()]);
        }
    }

    #[test]
    fn every_edge_references_live_distinct_nodes() {
        let mut engine = engine(ProjectionMode::Planar);
        for index in 0..20 {
            let angle = index as f32 * 0.3;
            add(&mut engine, &format!("c{index}"), vec![angle.cos(), angle.sin(), 0.5]);
        }
        for edge in engine.edges() {
            assert_ne!(edge.key.low, edge.key.high);
            assert!(engine.node(edge.key.low).is_some());
            assert!(engine.node(edge.key.high).is_some());
            assert!((-1.0..=1.0).contains(&edge.weight));
        }
        let mut keys = engine.edges().iter().map(|edge| edge.key).collect::<Vec<_>>();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), engine.edges().len());
    }

    #[test]
    fn clear_resets_everything() {
        let mut engine = engine(ProjectionMode::Planar);
        add(&mut engine, "cat", vec![1.0, 0.0]);
        add(&mut engine, "dog", vec![0.8, 0.6]);
        engine.set_search("ca");
        engine.camera.drag(eframe::egui::vec2(40.0, 10.0));
        let generation = engine.generation();

        engine.clear_all();
        assert!(engine.nodes().is_empty());
        assert!(engine.edges().is_empty());
        assert!(engine.camera().is_neutral());
        assert!(engine.search().is_empty());
        assert_eq!(engine.dimension(), None);
        assert_ne!(engine.generation(), generation);

        add(&mut engine, "cat", vec![0.0, 0.0, 1.0]);
        assert_eq!(engine.nodes().len(), 1);
        assert_eq!(engine.nodes()[0].color, PALETTE[0]);
    }

    #[test]
    fn mode_switch_resets_camera_and_depth() {
        let mut engine = engine(ProjectionMode::Planar);
        add(&mut engine, "cat", vec![1.0, 0.0]);
        add(&mut engine, "dog", vec![0.8, 0.6]);
        engine.camera.drag(eframe::egui::vec2(25.0, 25.0));

        engine.set_mode(ProjectionMode::Volumetric);
        assert_eq!(engine.mode(), ProjectionMode::Volumetric);
        assert!(engine.camera().is_neutral());
        assert!(engine.simulation().is_volumetric());

        engine.set_mode(ProjectionMode::Planar);
        assert!(
            engine
                .simulation()
                .bodies()
                .iter()
                .all(|body| body.position.z == 0.0)
        );
    }

    #[test]
    fn neighbors_are_sorted_by_weight() {
        let mut engine = engine(ProjectionMode::Planar);
        let a = add(&mut engine, "a", vec![1.0, 0.0]);
        let b = add(&mut engine, "b", vec![0.0, 1.0]);
        let c = add(&mut engine, "c", vec![0.9, 0.1]);
        let neighbors = engine.neighbors(c);
        assert_eq!(neighbors.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn search_matches_fuzzily() {
        let mut engine = engine(ProjectionMode::Planar);
        let whale = add(&mut engine, "Blue Whale", vec![1.0, 0.0]);
        add(&mut engine, "pebble", vec![0.0, 1.0]);
        engine.set_search("whl");
        assert_eq!(engine.search_matches(), HashSet::from([whale]));
        engine.set_search("  ");
        assert!(engine.search_matches().is_empty());
    }

    #[test]
    fn layout_settles_after_insertions() {
        let mut engine = engine(ProjectionMode::Planar);
        add(&mut engine, "cat", vec![1.0, 0.0]);
        add(&mut engine, "dog", vec![0.8, 0.6]);
        let mut frames = 0;
        while engine.step(1.0 / 60.0) {
            frames += 1;
            assert!(frames < 10_000);
        }
        add(&mut engine, "cow", vec![0.6, 0.8]);
        assert!(engine.step(1.0 / 60.0));
    }
}
