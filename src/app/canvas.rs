use std::collections::HashMap;

use eframe::egui::{
    self, Align2, Color32, FontId, Painter, PointerButton, Pos2, Rect, Sense, Shape, Stroke, Ui,
    Vec2, vec2,
};

use flowverse::graph::{DrawCommand, EdgePath, InteractionEvent, ViewTransform};

use super::ViewModel;

const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
const GRID: Color32 = Color32::from_rgba_premultiplied(16, 19, 22, 70);
const SELECTED: Color32 = Color32::from_rgb(245, 206, 93);
const LABEL: Color32 = Color32::from_gray(238);
const ARROW_LENGTH: f32 = 10.0;

fn draw_background(painter: &Painter, rect: Rect, transform: ViewTransform) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (56.0 * transform.scale.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + transform.translate;

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            Stroke::new(1.0, GRID),
        );
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            Stroke::new(1.0, GRID),
        );
        y += step;
    }
}

fn arrowhead(tip: Pos2, direction: Vec2, length: f32) -> Vec<Pos2> {
    let normal = vec2(-direction.y, direction.x);
    let base = tip - direction * length;
    vec![tip, base + normal * (length * 0.45), base - normal * (length * 0.45)]
}

fn paint_commands(painter: &Painter, rect: Rect, transform: ViewTransform, commands: &[DrawCommand]) {
    let scale = transform.scale;
    let screen = |world: Vec2| transform.to_screen(rect, world);
    let mut markers = HashMap::new();

    for command in commands {
        match command {
            DrawCommand::Marker { flow_id, color } => {
                markers.insert(flow_id.as_str(), *color);
            }
            DrawCommand::Edge {
                flow_id,
                path,
                color,
                width,
                opacity,
            } => {
                let points = path.points().into_iter().map(screen).collect::<Vec<_>>();
                let stroke_color = color.gamma_multiply(*opacity);
                painter.add(Shape::line(points, Stroke::new(width * scale, stroke_color)));

                let (tip, direction) = path.arrow_tip();
                let marker = markers.get(flow_id.as_str()).copied().unwrap_or(*color);
                let length = match path {
                    EdgePath::Loop { .. } => ARROW_LENGTH * 0.8,
                    _ => ARROW_LENGTH,
                } * scale;
                painter.add(Shape::convex_polygon(
                    arrowhead(screen(tip), direction, length),
                    marker.gamma_multiply(*opacity),
                    Stroke::NONE,
                ));
            }
            DrawCommand::Node {
                center,
                radius,
                fill,
                stroke,
                stroke_width,
                selected,
                ..
            } => {
                let position = screen(*center);
                let radius = radius * scale;
                painter.circle_filled(position, radius, *fill);
                painter.circle_stroke(position, radius, Stroke::new(stroke_width * scale, *stroke));
                if *selected {
                    painter.circle_stroke(
                        position,
                        radius + 5.0 * scale,
                        Stroke::new(2.0, SELECTED.gamma_multiply(0.85)),
                    );
                }
            }
            DrawCommand::Label { text, position, .. } => {
                let size = 12.0 * scale;
                if size < 5.0 {
                    continue;
                }
                painter.text(
                    screen(*position),
                    Align2::CENTER_CENTER,
                    text,
                    FontId::proportional(size),
                    LABEL,
                );
            }
        }
    }
}

impl ViewModel {
    fn forward_pointer(&mut self, ui: &Ui, response: &egui::Response) {
        let (pressed, released, pointer, scroll) = ui.input(|input| {
            (
                input.pointer.button_pressed(PointerButton::Primary),
                input.pointer.button_released(PointerButton::Primary),
                input.pointer.interact_pos(),
                input.raw_scroll_delta.y,
            )
        });

        if response.hovered()
            && let Some(position) = pointer
        {
            self.graph.scroll(position, scroll);
        }

        if pressed
            && response.hovered()
            && let Some(position) = pointer
        {
            self.graph.pointer_pressed(position);
        }

        match pointer {
            Some(position) if response.hovered() || self.graph.gesture_active() => {
                self.graph.pointer_moved(position);
            }
            _ => self.graph.pointer_left(),
        }

        if released {
            match self.graph.pointer_released() {
                Some(InteractionEvent::NodeClicked(id)) => self.on_node_click(id),
                Some(InteractionEvent::BackgroundClicked) => self.selected = None,
                None => {}
            }
        }
    }

    fn on_node_click(&mut self, id: String) {
        self.selected = Some(id);
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.forward_pointer(ui, &response);
        self.graph.set_external_hovered_flow(self.hovered_flow.clone());
        self.graph.set_selected(self.selected.clone());
        let matches = self.search_matches();
        self.graph.set_search_matches(matches);

        let commands = self.graph.frame(rect);
        let transform = self.graph.transform();
        draw_background(&painter, rect, transform);
        paint_commands(&painter, rect, transform, &commands);

        if self.store.document().elements.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No elements yet",
                FontId::proportional(16.0),
                Color32::from_gray(150),
            );
        }

        if self.graph.dragged_node().is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if self.graph.hovered_node().is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        if let Some(element) = self
            .graph
            .hovered_node()
            .and_then(|id| self.store.document().element(id))
        {
            let mut text = format!(
                "{}  |  used by {} flow(s)",
                element.name,
                self.graph.usage(&element.id)
            );
            if element.is_buggy {
                text.push_str("  |  buggy");
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        } else if let Some(flow) = self
            .graph
            .hovered_flow()
            .and_then(|id| self.store.document().flow(id))
        {
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!("{}  |  {}", flow.name, flow.group_label()),
                FontId::proportional(13.0),
                self.graph.palette().color(&flow.id),
            );
        }

        if self.graph.is_animating() {
            ui.ctx().request_repaint();
        }
    }
}
