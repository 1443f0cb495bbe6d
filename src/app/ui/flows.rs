use std::collections::BTreeMap;

use eframe::egui::{self, Color32, RichText, Sense, Ui, vec2};
use tracing::warn;

use super::super::ViewModel;

struct FlowRow {
    id: String,
    name: String,
    color: Color32,
    hidden: bool,
    methods: Vec<String>,
}

enum FlowAction {
    SetHidden(String, bool),
    SetGroupHidden(Vec<String>, bool),
    RemoveMethod(String, usize),
    DeleteFlow(String),
}

impl ViewModel {
    fn flow_rows(&self) -> BTreeMap<String, Vec<FlowRow>> {
        let document = self.store.document();
        let name_of = |id: &str| {
            document
                .element(id)
                .map(|element| element.name.clone())
                .unwrap_or_else(|| format!("<missing {id}>"))
        };

        let mut groups: BTreeMap<String, Vec<FlowRow>> = BTreeMap::new();
        for flow in &document.flows {
            groups
                .entry(flow.group_label().to_owned())
                .or_default()
                .push(FlowRow {
                    id: flow.id.clone(),
                    name: flow.name.clone(),
                    color: self.graph.palette().color(&flow.id),
                    hidden: self.hidden_flows.contains(&flow.id),
                    methods: flow
                        .methods
                        .iter()
                        .map(|method| {
                            method
                                .iter()
                                .map(|id| name_of(id))
                                .collect::<Vec<_>>()
                                .join(" -> ")
                        })
                        .collect(),
                });
        }
        groups
    }

    pub(in crate::app) fn draw_flow_list(&mut self, ui: &mut Ui) {
        ui.heading("Flows");
        ui.add_space(4.0);

        let groups = self.flow_rows();
        if groups.is_empty() {
            ui.label("No flows yet.");
            return;
        }

        let mut actions = Vec::new();
        for (group, rows) in &groups {
            let all_hidden = rows.iter().all(|row| row.hidden);
            ui.horizontal(|ui| {
                ui.label(RichText::new(group).strong());
                let (label, hide) = if all_hidden {
                    ("Show all", false)
                } else {
                    ("Hide all", true)
                };
                if ui.small_button(label).clicked() {
                    actions.push(FlowAction::SetGroupHidden(
                        rows.iter().map(|row| row.id.clone()).collect(),
                        hide,
                    ));
                }
            });

            for row in rows {
                let response = ui
                    .horizontal(|ui| {
                        let (swatch, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
                        ui.painter().rect_filled(swatch, 2.0, row.color);

                        let mut visible = !row.hidden;
                        if ui.checkbox(&mut visible, "").changed() {
                            actions.push(FlowAction::SetHidden(row.id.clone(), !visible));
                        }

                        egui::CollapsingHeader::new(format!(
                            "{}  ({} methods)",
                            row.name,
                            row.methods.len()
                        ))
                        .id_salt(("flow", row.id.as_str()))
                        .show(ui, |ui| {
                            for (index, method) in row.methods.iter().enumerate() {
                                ui.horizontal(|ui| {
                                    ui.small(format!("{}.", index + 1));
                                    ui.label(method.as_str());
                                    if ui
                                        .small_button("x")
                                        .on_hover_text("Remove this method")
                                        .clicked()
                                    {
                                        actions.push(FlowAction::RemoveMethod(row.id.clone(), index));
                                    }
                                });
                            }
                            if ui.button("Delete flow").clicked() {
                                actions.push(FlowAction::DeleteFlow(row.id.clone()));
                            }
                        });
                    })
                    .response;

                if response.hovered() && !row.hidden {
                    self.hovered_flow = Some(row.id.clone());
                }
            }
            ui.add_space(6.0);
        }

        for action in actions {
            self.apply_flow_action(action);
        }
    }

    fn apply_flow_action(&mut self, action: FlowAction) {
        let result = match action {
            FlowAction::SetHidden(id, hidden) => {
                self.set_flow_hidden(&id, hidden);
                Ok(())
            }
            FlowAction::SetGroupHidden(ids, hidden) => {
                for id in ids {
                    self.set_flow_hidden(&id, hidden);
                }
                Ok(())
            }
            FlowAction::RemoveMethod(id, index) => self.store.remove_method(&id, index).map(|_| ()),
            FlowAction::DeleteFlow(id) => self.store.delete_flow(&id),
        };

        if let Err(error) = result {
            warn!(%error, "flow edit rejected");
            self.status = Some(error.to_string());
        }
    }
}
