use eframe::egui::{Pos2, Rect, Vec2};

use super::geometry::EdgePath;
use super::simulation::SimNode;

pub const MIN_SCALE: f32 = 0.2;
pub const MAX_SCALE: f32 = 5.0;
pub const DRAG_THRESHOLD: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn to_screen(&self, viewport: Rect, world: Vec2) -> Pos2 {
        viewport.center() + self.translate + world * self.scale
    }

    pub fn to_world(&self, viewport: Rect, screen: Pos2) -> Vec2 {
        (screen - viewport.center() - self.translate) / self.scale
    }

    pub fn pan(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.translate += delta;
        }
    }

    pub fn zoom_about(&mut self, viewport: Rect, pointer: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world_before = self.to_world(viewport, pointer);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.translate = pointer - viewport.center() - world_before * self.scale;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    Pressed {
        node: Option<String>,
        origin: Pos2,
    },
    Dragging {
        node: String,
    },
    Panning {
        last: Pos2,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum GestureStep {
    None,
    Click(String),
    BackgroundClick,
    DragStart { node: String, at: Pos2 },
    DragMove { node: String, at: Pos2 },
    DragEnd(String),
    Pan(Vec2),
}

#[derive(Debug, Default)]
pub struct GestureTracker {
    state: Gesture,
}

impl GestureTracker {
    pub fn is_active(&self) -> bool {
        self.state != Gesture::Idle
    }

    pub fn dragged_node(&self) -> Option<&str> {
        match &self.state {
            Gesture::Dragging { node } => Some(node),
            _ => None,
        }
    }

    pub fn press(&mut self, at: Pos2, node: Option<String>) {
        self.state = Gesture::Pressed { node, origin: at };
    }

    pub fn move_to(&mut self, at: Pos2) -> GestureStep {
        match std::mem::take(&mut self.state) {
            Gesture::Idle => GestureStep::None,
            Gesture::Pressed { node, origin } => {
                if (at - origin).length() <= DRAG_THRESHOLD {
                    self.state = Gesture::Pressed { node, origin };
                    return GestureStep::None;
                }
                match node {
                    Some(node) => {
                        self.state = Gesture::Dragging { node: node.clone() };
                        GestureStep::DragStart { node, at }
                    }
                    None => {
                        self.state = Gesture::Panning { last: at };
                        GestureStep::Pan(at - origin)
                    }
                }
            }
            Gesture::Dragging { node } => {
                self.state = Gesture::Dragging { node: node.clone() };
                GestureStep::DragMove { node, at }
            }
            Gesture::Panning { last } => {
                self.state = Gesture::Panning { last: at };
                GestureStep::Pan(at - last)
            }
        }
    }

    pub fn release(&mut self) -> GestureStep {
        match std::mem::take(&mut self.state) {
            Gesture::Idle | Gesture::Panning { .. } => GestureStep::None,
            Gesture::Pressed {
                node: Some(node), ..
            } => GestureStep::Click(node),
            Gesture::Pressed { node: None, .. } => GestureStep::BackgroundClick,
            Gesture::Dragging { node } => GestureStep::DragEnd(node),
        }
    }

    pub fn cancel(&mut self) -> GestureStep {
        match std::mem::take(&mut self.state) {
            Gesture::Dragging { node } => GestureStep::DragEnd(node),
            _ => GestureStep::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    NodeClicked(String),
    BackgroundClicked,
}

pub fn hit_node(nodes: &[SimNode], world: Vec2) -> Option<&SimNode> {
    nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| (node.position - world).length_sq() <= node.radius * node.radius)
        .max_by(|(a_index, a), (b_index, b)| {
            a.radius.total_cmp(&b.radius).then(a_index.cmp(b_index))
        })
        .map(|(_, node)| node)
}

pub fn hit_edge(paths: &[(usize, EdgePath)], world: Vec2, tolerance: f32) -> Option<usize> {
    paths
        .iter()
        .map(|(index, path)| (*index, path.distance_to(world)))
        .filter(|(_, distance)| distance.is_finite() && *distance <= tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}
