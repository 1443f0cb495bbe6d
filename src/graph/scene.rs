use std::collections::{HashMap, HashSet};

use eframe::egui::{Color32, Vec2};

use super::geometry::{EdgePath, EdgeSpec, RADIUS_RANGE, TOTAL_SHIFT, edge_path};
use super::links::Link;
use super::palette::{FlowPalette, blend_color, dim_color};
use super::simulation::SimNode;
use crate::flow::Element;
use crate::util::truncate_label;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneStyle {
    pub total_shift: f32,
    pub radius_range: (f32, f32),
    pub label_budget: usize,
    pub link_width: f32,
    pub emphasis_width: f32,
    pub dim_opacity: f32,
    pub node_fill: Color32,
    pub node_stroke: Color32,
    pub buggy_stroke: Color32,
    pub stroke_width: f32,
    pub buggy_stroke_width: f32,
    pub match_color: Color32,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            total_shift: TOTAL_SHIFT,
            radius_range: RADIUS_RANGE,
            label_budget: 12,
            link_width: 2.5,
            emphasis_width: 4.0,
            dim_opacity: 0.2,
            node_fill: Color32::from_rgb(34, 41, 51),
            node_stroke: Color32::from_rgb(103, 196, 255),
            buggy_stroke: Color32::from_rgb(232, 72, 72),
            stroke_width: 2.5,
            buggy_stroke_width: 4.0,
            match_color: Color32::from_rgb(103, 196, 255),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Marker { flow_id: String, color: Color32 },
    Edge {
        flow_id: String,
        path: EdgePath,
        color: Color32,
        width: f32,
        opacity: f32,
    },
    Node {
        id: String,
        center: Vec2,
        radius: f32,
        fill: Color32,
        stroke: Color32,
        stroke_width: f32,
        selected: bool,
        matched: bool,
    },
    Label {
        id: String,
        text: String,
        position: Vec2,
    },
}

pub struct SceneInput<'a> {
    pub elements: &'a [Element],
    pub links: &'a [Link],
    pub nodes: &'a [SimNode],
    pub palette: &'a FlowPalette,
    pub style: &'a SceneStyle,
    pub hovered_flow: Option<&'a str>,
    pub external_hovered_flow: Option<&'a str>,
    pub selected: Option<&'a str>,
    pub matches: Option<&'a HashSet<String>>,
}

impl SceneInput<'_> {
    pub fn emphasised_flow(&self) -> Option<&str> {
        self.hovered_flow.or(self.external_hovered_flow)
    }
}

pub fn edge_paths(links: &[Link], nodes: &[SimNode], total_shift: f32) -> Vec<(usize, EdgePath)> {
    let by_id = nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect::<HashMap<_, _>>();

    links
        .iter()
        .enumerate()
        .filter_map(|(index, link)| {
            let source = by_id.get(link.source.as_str())?;
            let target = by_id.get(link.target.as_str())?;
            let spec = EdgeSpec {
                source: source.position,
                target: target.position,
                source_radius: source.radius,
                target_radius: target.radius,
                parallel_index: link.parallel_index,
                parallel_total: link.parallel_total,
                reversed: link.is_reversed(),
                self_loop: link.is_self_loop(),
            };
            let path = edge_path(&spec, total_shift);
            path.is_finite().then_some((index, path))
        })
        .collect()
}

pub fn render(input: &SceneInput<'_>) -> Vec<DrawCommand> {
    let style = input.style;
    let mut commands = Vec::with_capacity(input.links.len() + input.nodes.len() * 2);

    let mut marked = HashSet::new();
    for link in input.links {
        if marked.insert(link.flow_id.as_str()) {
            commands.push(DrawCommand::Marker {
                flow_id: link.flow_id.clone(),
                color: input.palette.color(&link.flow_id),
            });
        }
    }

    let emphasised = input.emphasised_flow();
    for (index, path) in edge_paths(input.links, input.nodes, style.total_shift) {
        let link = &input.links[index];
        let (width, opacity) = match emphasised {
            Some(flow_id) if flow_id == link.flow_id => (style.emphasis_width, 1.0),
            Some(_) => (style.link_width, style.dim_opacity),
            None => (style.link_width, 1.0),
        };
        commands.push(DrawCommand::Edge {
            flow_id: link.flow_id.clone(),
            path,
            color: input.palette.color(&link.flow_id),
            width,
            opacity,
        });
    }

    let elements = input
        .elements
        .iter()
        .map(|element| (element.id.as_str(), element))
        .collect::<HashMap<_, _>>();

    // Smaller nodes first so hubs stay on top.
    let mut order = (0..input.nodes.len()).collect::<Vec<_>>();
    order.sort_by(|a, b| input.nodes[*a].radius.total_cmp(&input.nodes[*b].radius));

    let mut labels = Vec::with_capacity(order.len());
    for index in order {
        let node = &input.nodes[index];
        let Some(element) = elements.get(node.id.as_str()) else {
            continue;
        };
        if !node.position.is_finite() {
            continue;
        }

        let matched = input
            .matches
            .is_some_and(|matches| matches.contains(&element.id));
        let fill = match input.matches {
            Some(_) if matched => blend_color(style.node_fill, style.match_color, 0.55),
            Some(_) => dim_color(style.node_fill, 0.6),
            None => style.node_fill,
        };
        let (stroke, stroke_width) = if element.is_buggy {
            (style.buggy_stroke, style.buggy_stroke_width)
        } else {
            (style.node_stroke, style.stroke_width)
        };

        commands.push(DrawCommand::Node {
            id: element.id.clone(),
            center: node.position,
            radius: node.radius,
            fill,
            stroke,
            stroke_width,
            selected: input.selected == Some(element.id.as_str()),
            matched,
        });
        labels.push(DrawCommand::Label {
            id: element.id.clone(),
            text: truncate_label(&element.name, style.label_budget),
            position: node.position,
        });
    }

    commands.extend(labels);
    commands
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::flow::sample_document;
    use crate::graph::links::derive_links;

    fn sim_nodes(elements: &[Element]) -> Vec<SimNode> {
        elements
            .iter()
            .enumerate()
            .map(|(index, element)| SimNode {
                id: element.id.clone(),
                position: vec2(index as f32 * 120.0, (index % 2) as f32 * 90.0),
                velocity: Vec2::ZERO,
                pinned: None,
                radius: 25.0 + index as f32,
            })
            .collect()
    }

    fn palette_for(links: &[Link]) -> FlowPalette {
        let mut palette = FlowPalette::default();
        palette.sync(links.iter().map(|link| link.flow_id.as_str()));
        palette
    }

    fn edges(commands: &[DrawCommand]) -> Vec<(&str, f32, f32)> {
        commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Edge {
                    flow_id,
                    width,
                    opacity,
                    ..
                } => Some((flow_id.as_str(), *width, *opacity)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rendering_is_idempotent() {
        let document = sample_document();
        let links = derive_links(&document.elements, &document.flows, &HashSet::new());
        let nodes = sim_nodes(&document.elements);
        let palette = palette_for(&links);
        let style = SceneStyle::default();
        let input = SceneInput {
            elements: &document.elements,
            links: &links,
            nodes: &nodes,
            palette: &palette,
            style: &style,
            hovered_flow: None,
            external_hovered_flow: Some("102"),
            selected: Some("2"),
            matches: None,
        };

        assert_eq!(render(&input), render(&input));
    }

    #[test]
    fn empty_input_renders_nothing() {
        let palette = FlowPalette::default();
        let style = SceneStyle::default();
        let input = SceneInput {
            elements: &[],
            links: &[],
            nodes: &[],
            palette: &palette,
            style: &style,
            hovered_flow: None,
            external_hovered_flow: None,
            selected: None,
            matches: None,
        };
        assert!(render(&input).is_empty());
    }

    #[test]
    fn commands_are_layered_and_labels_truncated() {
        let document = sample_document();
        let links = derive_links(&document.elements, &document.flows, &HashSet::new());
        let nodes = sim_nodes(&document.elements);
        let palette = palette_for(&links);
        let style = SceneStyle::default();
        let commands = render(&SceneInput {
            elements: &document.elements,
            links: &links,
            nodes: &nodes,
            palette: &palette,
            style: &style,
            hovered_flow: None,
            external_hovered_flow: None,
            selected: None,
            matches: None,
        });

        let rank = |command: &DrawCommand| match command {
            DrawCommand::Marker { .. } => 0,
            DrawCommand::Edge { .. } => 1,
            DrawCommand::Node { .. } => 2,
            DrawCommand::Label { .. } => 3,
        };
        assert!(commands.windows(2).all(|pair| rank(&pair[0]) <= rank(&pair[1])));

        let markers = commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Marker { .. }))
            .count();
        assert_eq!(markers, 3);
        assert!(edges(&commands).iter().all(|(_, width, opacity)| *width == 2.5 && *opacity == 1.0));

        let forgot = commands.iter().find_map(|command| match command {
            DrawCommand::Label { id, text, .. } if id == "5" => Some(text.as_str()),
            _ => None,
        });
        assert_eq!(forgot, Some("Forgot Pas..."));

        let buggy = commands.iter().find_map(|command| match command {
            DrawCommand::Node {
                id, stroke_width, ..
            } if id == "2" => Some(*stroke_width),
            _ => None,
        });
        assert_eq!(buggy, Some(4.0));
    }

    #[test]
    fn canvas_hover_overrides_external_hover() {
        let document = sample_document();
        let links = derive_links(&document.elements, &document.flows, &HashSet::new());
        let nodes = sim_nodes(&document.elements);
        let palette = palette_for(&links);
        let style = SceneStyle::default();
        let mut input = SceneInput {
            elements: &document.elements,
            links: &links,
            nodes: &nodes,
            palette: &palette,
            style: &style,
            hovered_flow: None,
            external_hovered_flow: Some("101"),
            selected: None,
            matches: None,
        };

        for (flow_id, width, opacity) in edges(&render(&input)) {
            if flow_id == "101" {
                assert_eq!((width, opacity), (4.0, 1.0));
            } else {
                assert_eq!((width, opacity), (2.5, 0.2));
            }
        }

        input.hovered_flow = Some("103");
        for (flow_id, width, _) in edges(&render(&input)) {
            assert_eq!(width == 4.0, flow_id == "103");
        }

        // Leaving the canvas falls back to the externally pinned flow.
        input.hovered_flow = None;
        assert_eq!(input.emphasised_flow(), Some("101"));
    }

    #[test]
    fn nodes_without_elements_are_not_drawn() {
        let document = sample_document();
        let mut nodes = sim_nodes(&document.elements);
        nodes.push(SimNode {
            id: "phantom".to_owned(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            pinned: None,
            radius: 25.0,
        });
        let palette = FlowPalette::default();
        let style = SceneStyle::default();
        let matches = HashSet::from(["1".to_owned()]);
        let commands = render(&SceneInput {
            elements: &document.elements,
            links: &[],
            nodes: &nodes,
            palette: &palette,
            style: &style,
            hovered_flow: None,
            external_hovered_flow: None,
            selected: None,
            matches: Some(&matches),
        });

        let drawn = commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Node { id, matched, .. } => Some((id.as_str(), *matched)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(drawn.len(), document.elements.len());
        assert!(drawn.contains(&("1", true)));
        assert!(drawn.contains(&("3", false)));
    }
}
