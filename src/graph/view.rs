use std::collections::{HashMap, HashSet};

use eframe::egui::{Pos2, Rect, Vec2};
use tracing::{debug, info};

use super::geometry::{RadiusScale, usage_counts};
use super::interaction::{
    GestureStep, GestureTracker, InteractionEvent, ViewTransform, hit_edge, hit_node,
};
use super::links::{Link, derive_links};
use super::palette::FlowPalette;
use super::scene::{DrawCommand, SceneInput, SceneStyle, edge_paths, render};
use super::simulation::{NodeSeed, SimNode, Simulation, SimulationConfig};
use crate::flow::{Element, Flow};

const EDGE_HOVER_TOLERANCE: f32 = 6.0;

pub struct GraphView {
    simulation: Simulation,
    palette: FlowPalette,
    style: SceneStyle,
    transform: ViewTransform,
    gesture: GestureTracker,
    elements: Vec<Element>,
    links: Vec<Link>,
    usage: HashMap<String, usize>,
    viewport: Option<Rect>,
    hovered_node: Option<String>,
    hovered_flow: Option<String>,
    external_hovered_flow: Option<String>,
    selected: Option<String>,
    matches: Option<HashSet<String>>,
}

impl Default for GraphView {
    fn default() -> Self {
        Self::new(SimulationConfig::default(), SceneStyle::default())
    }
}

impl GraphView {
    pub fn new(config: SimulationConfig, style: SceneStyle) -> Self {
        Self {
            simulation: Simulation::new(config),
            palette: FlowPalette::default(),
            style,
            transform: ViewTransform::default(),
            gesture: GestureTracker::default(),
            elements: Vec::new(),
            links: Vec::new(),
            usage: HashMap::new(),
            viewport: None,
            hovered_node: None,
            hovered_flow: None,
            external_hovered_flow: None,
            selected: None,
            matches: None,
        }
    }

    pub fn set_data(&mut self, elements: &[Element], flows: &[Flow], hidden: &HashSet<String>) {
        self.palette.sync(
            flows
                .iter()
                .filter(|flow| !flow.id.is_empty())
                .map(|flow| flow.id.as_str()),
        );

        let visible = flows
            .iter()
            .filter(|flow| !flow.id.is_empty() && !hidden.contains(&flow.id))
            .cloned()
            .collect::<Vec<_>>();
        let links = derive_links(elements, &visible, &HashSet::new());
        let usage = usage_counts(elements, &visible);
        let scale = RadiusScale::from_usage(usage.values().copied(), self.style.radius_range);

        let seeds = elements
            .iter()
            .map(|element| NodeSeed {
                id: element.id.clone(),
                radius: scale.radius(usage.get(&element.id).copied().unwrap_or(0)),
            })
            .collect::<Vec<_>>();
        self.simulation.update(&seeds, &links);

        self.elements = elements.to_vec();
        self.links = links;
        self.usage = usage;

        let known = |id: &Option<String>| {
            id.as_deref()
                .is_some_and(|id| self.elements.iter().any(|element| element.id == id))
        };
        if !known(&self.selected) {
            self.selected = None;
        }
        if !known(&self.hovered_node) {
            self.hovered_node = None;
        }
        let flow_visible = |id: &Option<String>| {
            id.as_deref()
                .is_some_and(|id| self.links.iter().any(|link| link.flow_id == id))
        };
        if !flow_visible(&self.hovered_flow) {
            self.hovered_flow = None;
        }

        info!(
            elements = self.elements.len(),
            flows = visible.len(),
            links = self.links.len(),
            "graph rebuilt"
        );
    }

    /// Advances the simulation once and renders. A viewport with no area
    /// counts as torn down: nothing ticks and nothing is drawn.
    pub fn frame(&mut self, viewport: Rect) -> Vec<DrawCommand> {
        if !viewport.is_finite() || viewport.width() <= 0.0 || viewport.height() <= 0.0 {
            self.viewport = None;
            return Vec::new();
        }
        self.viewport = Some(viewport);

        if self.simulation.is_running() {
            self.simulation.tick();
        }
        self.commands()
    }

    pub fn commands(&self) -> Vec<DrawCommand> {
        render(&SceneInput {
            elements: &self.elements,
            links: &self.links,
            nodes: self.simulation.nodes(),
            palette: &self.palette,
            style: &self.style,
            hovered_flow: self.hovered_flow.as_deref(),
            external_hovered_flow: self.external_hovered_flow.as_deref(),
            selected: self.selected.as_deref(),
            matches: self.matches.as_ref(),
        })
    }

    pub fn is_animating(&self) -> bool {
        self.simulation.is_running() || self.gesture.is_active()
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture.is_active()
    }

    pub fn dragged_node(&self) -> Option<&str> {
        self.gesture.dragged_node()
    }

    pub fn teardown(&mut self) {
        let step = self.gesture.cancel();
        self.apply_step(step);
        self.simulation.stop();
        self.viewport = None;
        debug!("graph view torn down");
    }

    pub fn reheat(&mut self) {
        self.simulation.reheat();
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        self.simulation.config()
    }

    pub fn set_simulation_config(&mut self, config: SimulationConfig) {
        self.simulation.set_config(config);
    }

    pub fn alpha(&self) -> f32 {
        self.simulation.alpha()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn palette(&self) -> &FlowPalette {
        &self.palette
    }

    pub fn usage(&self, element_id: &str) -> usize {
        self.usage.get(element_id).copied().unwrap_or(0)
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.simulation.node(id)
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    pub fn screen_position(&self, id: &str) -> Option<Pos2> {
        let viewport = self.viewport?;
        let node = self.simulation.node(id)?;
        Some(self.transform.to_screen(viewport, node.position))
    }

    pub fn hovered_node(&self) -> Option<&str> {
        self.hovered_node.as_deref()
    }

    pub fn hovered_flow(&self) -> Option<&str> {
        self.hovered_flow.as_deref()
    }

    pub fn set_external_hovered_flow(&mut self, flow_id: Option<String>) {
        self.external_hovered_flow = flow_id;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_selected(&mut self, id: Option<String>) {
        self.selected = id;
    }

    pub fn set_search_matches(&mut self, matches: Option<HashSet<String>>) {
        self.matches = matches;
    }

    pub fn pointer_pressed(&mut self, screen: Pos2) {
        let Some(world) = self.world(screen) else {
            return;
        };
        let node = hit_node(self.simulation.nodes(), world).map(|node| node.id.clone());
        self.gesture.press(screen, node);
    }

    pub fn pointer_moved(&mut self, screen: Pos2) {
        let step = self.gesture.move_to(screen);
        self.apply_step(step);
        if self.gesture.dragged_node().is_none() {
            self.update_hover(screen);
        }
    }

    pub fn pointer_released(&mut self) -> Option<InteractionEvent> {
        let step = self.gesture.release();
        self.apply_step(step)
    }

    pub fn pointer_left(&mut self) {
        let step = self.gesture.cancel();
        self.apply_step(step);
        self.hovered_node = None;
        self.hovered_flow = None;
    }

    pub fn scroll(&mut self, screen: Pos2, delta: f32) {
        let Some(viewport) = self.viewport else {
            return;
        };
        if delta.abs() <= f32::EPSILON {
            return;
        }
        let factor = (1.0 + delta * 0.0018).clamp(0.85, 1.15);
        self.transform.zoom_about(viewport, screen, factor);
    }

    pub fn zoom_by(&mut self, factor: f32) {
        if let Some(viewport) = self.viewport {
            self.transform.zoom_about(viewport, viewport.center(), factor);
        }
    }

    pub fn reset_view(&mut self) {
        self.transform = ViewTransform::default();
    }

    fn world(&self, screen: Pos2) -> Option<Vec2> {
        let viewport = self.viewport?;
        let world = self.transform.to_world(viewport, screen);
        world.is_finite().then_some(world)
    }

    fn update_hover(&mut self, screen: Pos2) {
        let Some(world) = self.world(screen) else {
            return;
        };

        self.hovered_node = hit_node(self.simulation.nodes(), world).map(|node| node.id.clone());
        self.hovered_flow = if self.hovered_node.is_some() {
            None
        } else {
            let paths = edge_paths(&self.links, self.simulation.nodes(), self.style.total_shift);
            hit_edge(&paths, world, EDGE_HOVER_TOLERANCE / self.transform.scale)
                .map(|index| self.links[index].flow_id.clone())
        };
    }

    fn apply_step(&mut self, step: GestureStep) -> Option<InteractionEvent> {
        match step {
            GestureStep::None => None,
            GestureStep::Click(id) => {
                info!(element = %id, "node clicked");
                Some(InteractionEvent::NodeClicked(id))
            }
            GestureStep::BackgroundClick => Some(InteractionEvent::BackgroundClicked),
            GestureStep::DragStart { node, at } => {
                if self.simulation.begin_drag(&node) {
                    debug!(element = %node, "drag started");
                    if let Some(world) = self.world(at) {
                        self.simulation.drag_to(&node, world);
                    }
                }
                None
            }
            GestureStep::DragMove { node, at } => {
                if let Some(world) = self.world(at) {
                    self.simulation.drag_to(&node, world);
                }
                None
            }
            GestureStep::DragEnd(node) => {
                self.simulation.end_drag(&node);
                debug!(element = %node, "drag ended");
                None
            }
            GestureStep::Pan(delta) => {
                self.transform.pan(delta);
                None
            }
        }
    }
}
