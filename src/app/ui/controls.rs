use std::ops::RangeInclusive;

use eframe::egui::{self, Key, Ui};
use tracing::warn;

use flowverse::flow::ElementDraft;
use flowverse::graph::SimulationConfig;

use super::super::ViewModel;

fn physics_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hint: &str,
) -> bool {
    let step = f64::from((range.end() - range.start()) / 200.0);
    ui.add(
        egui::Slider::new(value, range)
            .text(text)
            .step_by(step)
            .clamping(egui::SliderClamping::Always),
    )
    .on_hover_text(hint)
    .changed()
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search elements")
            .on_hover_text("Fuzzy-highlight matching elements without changing the layout.");
        ui.text_edit_singleline(&mut self.search);

        ui.add_space(4.0);
        let mut add_requested = false;
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.new_element_name)
                    .hint_text("New element name")
                    .desired_width(180.0),
            );
            let submitted =
                response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            add_requested = ui.button("Add").clicked() || submitted;
        });
        if add_requested {
            self.add_element();
        }

        ui.collapsing("Physics tuning", |ui| {
            let mut config = self.graph.simulation_config();
            let mut changed = false;
            changed |= physics_slider(
                ui,
                &mut config.link_distance,
                40.0..=400.0,
                "Link distance",
                "Separation linked elements settle at.",
            );
            let mut repulsion = -config.charge_strength;
            changed |= physics_slider(
                ui,
                &mut repulsion,
                0.0..=1500.0,
                "Repulsion",
                "How strongly every pair of elements pushes apart.",
            );
            config.charge_strength = -repulsion;
            changed |= physics_slider(
                ui,
                &mut config.collision_padding,
                0.0..=30.0,
                "Collision padding",
                "Extra space kept between element circles.",
            );
            changed |= physics_slider(
                ui,
                &mut config.center_strength,
                0.0..=1.0,
                "Centering",
                "How quickly the layout drifts back to the canvas centre.",
            );
            changed |= physics_slider(
                ui,
                &mut config.velocity_decay,
                0.05..=0.9,
                "Velocity decay",
                "Fraction of velocity lost each tick.",
            );

            if changed {
                self.graph.set_simulation_config(config);
            }
            if ui.button("Restore defaults").clicked() {
                self.graph.set_simulation_config(SimulationConfig::default());
            }
        });
    }

    fn add_element(&mut self) {
        let draft = ElementDraft {
            name: self.new_element_name.clone(),
            ..ElementDraft::default()
        };
        match self.store.add_element(draft) {
            Ok(id) => {
                self.new_element_name.clear();
                self.selected = Some(id);
                self.status = None;
            }
            Err(error) => {
                warn!(%error, "element rejected");
                self.status = Some(error.to_string());
            }
        }
    }
}
