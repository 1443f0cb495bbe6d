use eframe::egui::{self, RichText, Ui};
use tracing::warn;

use flowverse::flow::ElementDraft;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Element Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected.clone() else {
            ui.label("Click an element in the graph to inspect it.");
            return;
        };

        let document = self.store.document();
        let Some(element) = document.element(&selected_id) else {
            ui.label("The selected element no longer exists.");
            return;
        };

        let name = element.name.clone();
        let is_buggy = element.is_buggy;
        let bug_details = element.bug_details().map(str::to_owned);
        let media_link = element.media_link.clone();
        let created_at = element.created_at;
        let referencing = document
            .flows_referencing(&selected_id)
            .map(|flow| (flow.id.clone(), flow.name.clone(), flow.group_label().to_owned()))
            .collect::<Vec<_>>();
        let draft = ElementDraft::from(element);

        ui.label(RichText::new(name.as_str()).strong());
        ui.small(format!("id {selected_id}"));
        ui.add_space(6.0);

        if is_buggy {
            ui.label(RichText::new("Status: buggy").color(egui::Color32::from_rgb(232, 72, 72)));
            if let Some(details) = &bug_details {
                ui.label(details.as_str());
            }
        } else {
            ui.label("Status: working");
        }

        if let Some(link) = &media_link {
            ui.hyperlink_to("Media", link.as_str());
        }
        ui.label(format!(
            "Created: {}",
            created_at.format("%Y-%m-%d %H:%M UTC")
        ));
        ui.label(format!(
            "Used by {} visible flow(s)",
            self.graph.usage(&selected_id)
        ));

        ui.separator();
        ui.label(RichText::new("Flows through this element").strong());
        if referencing.is_empty() {
            ui.label("No flow references this element.");
        }
        for (flow_id, flow_name, group) in &referencing {
            let color = self.graph.palette().color(flow_id);
            let response = ui.label(RichText::new(format!("{flow_name}  ({group})")).color(color));
            if response.hovered() && !self.hidden_flows.contains(flow_id) {
                self.hovered_flow = Some(flow_id.clone());
            }
        }

        ui.separator();
        let toggle_label = if is_buggy { "Mark as fixed" } else { "Mark as buggy" };
        ui.horizontal(|ui| {
            if ui.button(toggle_label).clicked() {
                let draft = ElementDraft {
                    is_buggy: !is_buggy,
                    ..draft.clone()
                };
                if let Err(error) = self.store.update_element(&selected_id, draft) {
                    warn!(%error, "element update rejected");
                    self.status = Some(error.to_string());
                }
            }

            let delete = ui
                .button(RichText::new("Delete element").color(egui::Color32::from_rgb(232, 72, 72)))
                .on_hover_text("Removes the element from every flow method that uses it.");
            if delete.clicked() {
                match self.store.delete_element(&selected_id) {
                    Ok(()) => self.selected = None,
                    Err(error) => {
                        warn!(%error, "element delete rejected");
                        self.status = Some(error.to_string());
                    }
                }
            }
        });
    }
}
