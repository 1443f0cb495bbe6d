mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use tracing::{debug, info, trace};

use super::links::Link;
use crate::util::stable_pair;
use forces::{
    CollisionParams, LinkConstraint, accumulate_charge_for_node, accumulate_collision_pairs,
    apply_center, apply_links,
};
use quadtree::QuadNode;

const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub center_strength: f32,
    pub velocity_decay: f32,
    pub alpha_warm: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub theta: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            link_distance: 150.0,
            charge_strength: -400.0,
            collision_padding: 6.0,
            collision_strength: 0.7,
            center_strength: 0.1,
            velocity_decay: 0.4,
            alpha_warm: 0.3,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            theta: 0.9,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeSeed {
    pub id: String,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub pinned: Option<Vec2>,
    pub radius: f32,
}

impl SimNode {
    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    predicted: Vec<Vec2>,
    velocities: Vec<Vec2>,
    impulses: Vec<Vec2>,
    radii: Vec<f32>,
    pinned: Vec<bool>,
}

pub struct Simulation {
    config: SimulationConfig,
    nodes: Vec<SimNode>,
    index_by_id: HashMap<String, usize>,
    constraints: Vec<LinkConstraint>,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    center: Vec2,
    scratch: Scratch,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            index_by_id: HashMap::new(),
            constraints: Vec::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            running: false,
            center: Vec2::ZERO,
            scratch: Scratch::default(),
        }
    }

    pub fn config(&self) -> SimulationConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SimulationConfig) {
        if self.config != config {
            self.config = config;
            self.reheat();
        }
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn set_center(&mut self, center: Vec2) {
        if center.is_finite() {
            self.center = center;
        }
    }

    /// Merges a new node/link set. Survivors keep position, velocity and pin;
    /// new ids are seeded on a spiral around the survivors.
    pub fn update(&mut self, seeds: &[NodeSeed], links: &[Link]) {
        let mut prior = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect::<HashMap<_, _>>();

        let mut anchor = Vec2::ZERO;
        let mut survivors = 0usize;
        for seed in seeds {
            if let Some(node) = prior.get(&seed.id) {
                anchor += node.position;
                survivors += 1;
            }
        }
        anchor = if survivors > 0 {
            anchor / survivors as f32
        } else {
            self.center
        };

        let mut spawned = 0usize;
        let mut nodes = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if let Some(mut node) = prior.remove(&seed.id) {
                node.radius = seed.radius;
                nodes.push(node);
                continue;
            }

            let ring = 10.0 * (0.5 + spawned as f32).sqrt();
            let angle = spawned as f32 * GOLDEN_ANGLE;
            let (jx, jy) = stable_pair(&seed.id);
            nodes.push(SimNode {
                id: seed.id.clone(),
                position: anchor + vec2(angle.cos(), angle.sin()) * ring + vec2(jx, jy) * 4.0,
                velocity: Vec2::ZERO,
                pinned: None,
                radius: seed.radius,
            });
            spawned += 1;
        }

        self.index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        self.nodes = nodes;
        self.constraints = self.build_constraints(links);

        debug!(
            nodes = self.nodes.len(),
            links = self.constraints.len(),
            spawned,
            dropped = prior.len(),
            "simulation updated"
        );
        self.reheat();
    }

    fn build_constraints(&self, links: &[Link]) -> Vec<LinkConstraint> {
        let resolved = links
            .iter()
            .filter_map(|link| {
                let source = *self.index_by_id.get(&link.source)?;
                let target = *self.index_by_id.get(&link.target)?;
                (source != target).then_some((source, target))
            })
            .collect::<Vec<_>>();

        let mut degree = vec![0usize; self.nodes.len()];
        for &(source, target) in &resolved {
            degree[source] += 1;
            degree[target] += 1;
        }

        resolved
            .into_iter()
            .map(|(source, target)| {
                let (source_degree, target_degree) = (degree[source] as f32, degree[target] as f32);
                LinkConstraint {
                    source,
                    target,
                    strength: 1.0 / source_degree.min(target_degree).max(1.0),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect()
    }

    pub fn reheat(&mut self) {
        if self.nodes.is_empty() {
            self.running = false;
            return;
        }
        self.alpha = self.alpha.max(self.config.alpha_warm);
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!(alpha = self.alpha, "simulation stopped");
        }
        self.running = false;
    }

    pub fn begin_drag(&mut self, id: &str) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        node.pinned = Some(node.position);
        node.velocity = Vec2::ZERO;
        self.alpha_target = self.config.alpha_warm;
        self.reheat();
        true
    }

    pub fn drag_to(&mut self, id: &str, world: Vec2) {
        if !world.is_finite() {
            return;
        }
        if let Some(&index) = self.index_by_id.get(id) {
            let node = &mut self.nodes[index];
            node.pinned = Some(world);
            node.position = world;
            node.velocity = Vec2::ZERO;
        }
    }

    pub fn end_drag(&mut self, id: &str) {
        if let Some(&index) = self.index_by_id.get(id) {
            self.nodes[index].pinned = None;
        }
        self.alpha_target = 0.0;
    }

    pub fn tick(&mut self) -> bool {
        if !self.running || self.nodes.is_empty() {
            self.running = false;
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;
        let config = self.config;

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        scratch.radii.clear();
        scratch.pinned.clear();
        let mut max_radius = 0.0_f32;
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
            let radius = node.radius + config.collision_padding;
            scratch.radii.push(radius);
            scratch.pinned.push(node.is_pinned());
            max_radius = max_radius.max(radius);
        }

        apply_links(
            &self.constraints,
            &scratch.positions,
            &mut scratch.velocities,
            config.link_distance,
            alpha,
        );

        if let Some(tree) = QuadNode::build(&scratch.positions) {
            let strength_alpha = config.charge_strength * alpha;
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_charge_for_node(
                    &tree,
                    index,
                    &scratch.positions,
                    strength_alpha,
                    config.theta,
                    velocity,
                );
            }
        }

        apply_center(
            &mut scratch.positions,
            &scratch.pinned,
            self.center,
            config.center_strength,
        );

        scratch.predicted.clear();
        scratch
            .predicted
            .extend(scratch.positions.iter().zip(&scratch.velocities).map(|(p, v)| *p + *v));
        scratch.impulses.clear();
        scratch.impulses.resize(self.nodes.len(), Vec2::ZERO);
        if let Some(tree) = QuadNode::build(&scratch.predicted) {
            let reach = max_radius * 2.0;
            accumulate_collision_pairs(
                &tree,
                &tree,
                true,
                &scratch.predicted,
                &scratch.radii,
                CollisionParams {
                    strength: config.collision_strength,
                    max_reach_sq: reach * reach,
                },
                &mut scratch.impulses,
            );
        }

        let retain = 1.0 - config.velocity_decay.clamp(0.0, 1.0);
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if let Some(pin) = node.pinned {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            let velocity = (scratch.velocities[index] + scratch.impulses[index]) * retain;
            let position = scratch.positions[index] + velocity;
            if velocity.is_finite() && position.is_finite() {
                node.velocity = velocity;
                node.position = position;
            } else {
                let (jx, jy) = stable_pair(&node.id);
                node.velocity = Vec2::ZERO;
                node.position = self.center + vec2(jx, jy) * 10.0;
            }
        }

        trace!(alpha, "simulation tick");
        if self.alpha < config.alpha_min && self.alpha_target <= 0.0 {
            self.running = false;
            info!(nodes = self.nodes.len(), "layout settled");
        }
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds(ids: &[&str]) -> Vec<NodeSeed> {
        ids.iter()
            .map(|id| NodeSeed {
                id: (*id).to_owned(),
                radius: 25.0,
            })
            .collect()
    }

    fn link(source: &str, target: &str) -> Link {
        Link {
            flow_id: "f".to_owned(),
            flow_name: "F".to_owned(),
            method_index: 0,
            source: source.to_owned(),
            target: target.to_owned(),
            parallel_index: 0,
            parallel_total: 1,
        }
    }

    fn run(simulation: &mut Simulation, ticks: usize) {
        for _ in 0..ticks {
            simulation.tick();
        }
    }

    #[test]
    fn empty_simulation_is_a_no_op() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.update(&[], &[]);
        assert!(!simulation.is_running());
        assert!(!simulation.tick());
        assert!(simulation.nodes().is_empty());
    }

    #[test]
    fn alpha_decays_until_settled() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.update(&seeds(&["a", "b"]), &[link("a", "b")]);
        assert_eq!(simulation.alpha(), 0.3);

        let mut previous = simulation.alpha();
        let mut ticks = 0;
        while simulation.tick() {
            assert!(simulation.alpha() < previous);
            previous = simulation.alpha();
            ticks += 1;
            assert!(ticks < 1_000, "simulation never settled");
        }
        assert!(simulation.alpha() < SimulationConfig::default().alpha_min);
        assert!(simulation.nodes().iter().all(|node| node.position.is_finite()));
    }

    #[test]
    fn linked_nodes_approach_link_distance() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.set_center(vec2(400.0, 300.0));
        simulation.update(&seeds(&["a", "b"]), &[link("a", "b")]);
        run(&mut simulation, 400);

        let a = simulation.node("a").expect("a").position;
        let b = simulation.node("b").expect("b").position;
        let distance = (a - b).length();
        assert!(distance > 60.0, "nodes collapsed to {distance}");
        assert!(distance < 600.0, "nodes flew apart to {distance}");
    }

    #[test]
    fn centroid_drifts_towards_center() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.set_center(vec2(500.0, 500.0));
        simulation.update(&seeds(&["a", "b", "c"]), &[link("a", "b"), link("b", "c")]);
        run(&mut simulation, 300);

        let centroid = simulation
            .nodes()
            .iter()
            .fold(Vec2::ZERO, |sum, node| sum + node.position)
            / 3.0;
        assert!((centroid - vec2(500.0, 500.0)).length() < 5.0);
    }

    #[test]
    fn updates_preserve_surviving_positions() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.update(&seeds(&["a", "b", "c"]), &[link("a", "b")]);
        run(&mut simulation, 50);
        let kept = simulation.node("b").expect("b").position;

        simulation.update(&seeds(&["b", "d"]), &[link("b", "d")]);
        assert_eq!(simulation.node("b").expect("b").position, kept);
        assert!(simulation.node("a").is_none());
        assert!(simulation.node("d").is_some());
        assert!(simulation.is_running());
        assert_eq!(simulation.nodes().len(), 2);
    }

    #[test]
    fn links_to_unknown_ids_are_ignored() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.update(&seeds(&["a"]), &[link("a", "ghost"), link("a", "a")]);
        assert_eq!(simulation.nodes().len(), 1);
        run(&mut simulation, 10);
        assert!(simulation.node("ghost").is_none());
    }

    #[test]
    fn dragged_node_tracks_pointer_and_resumes_on_release() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.update(&seeds(&["a", "b", "c"]), &[link("a", "b"), link("b", "c")]);
        run(&mut simulation, 500);
        assert!(!simulation.is_running());

        assert!(simulation.begin_drag("b"));
        assert!(simulation.is_running());
        for step in 0..20 {
            let pointer = vec2(700.0 + step as f32 * 5.0, -80.0);
            simulation.drag_to("b", pointer);
            simulation.tick();
            let node = simulation.node("b").expect("b");
            assert_eq!(node.position, pointer);
            assert!(node.is_pinned());
        }

        simulation.end_drag("b");
        let released_at = simulation.node("b").expect("b").position;
        simulation.tick();
        let node = simulation.node("b").expect("b");
        assert!(!node.is_pinned());
        assert_ne!(node.position, released_at);
    }

    #[test]
    fn coincident_seeds_separate() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.update(&seeds(&["a", "b"]), &[]);
        for node in &mut simulation.nodes {
            node.position = vec2(10.0, 10.0);
        }
        run(&mut simulation, 100);

        let a = simulation.node("a").expect("a").position;
        let b = simulation.node("b").expect("b").position;
        assert!(a.is_finite() && b.is_finite());
        assert!((a - b).length() > 10.0);
    }

    #[test]
    fn settled_sample_layout_keeps_circles_apart() {
        use std::collections::HashSet;

        use crate::flow::sample_document;
        use crate::graph::{RADIUS_RANGE, RadiusScale, derive_links, usage_counts};

        let document = sample_document();
        let links = derive_links(&document.elements, &document.flows, &HashSet::new());
        let usage = usage_counts(&document.elements, &document.flows);
        let scale = RadiusScale::from_usage(usage.values().copied(), RADIUS_RANGE);
        let seeds = document
            .elements
            .iter()
            .map(|element| NodeSeed {
                id: element.id.clone(),
                radius: scale.radius(usage.get(&element.id).copied().unwrap_or(0)),
            })
            .collect::<Vec<_>>();

        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.update(&seeds, &links);
        let mut ticks = 0;
        while simulation.tick() {
            ticks += 1;
            assert!(ticks < 5_000, "simulation never settled");
        }

        let nodes = simulation.nodes();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let distance = (a.position - b.position).length();
                assert!(
                    distance >= a.radius + b.radius,
                    "{} and {} overlap: {distance} < {}",
                    a.id,
                    b.id,
                    a.radius + b.radius
                );
            }
        }
    }
}
