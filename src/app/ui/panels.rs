use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use eframe::egui::{self, Align, Context, Layout};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use flowverse::flow::{Document, FlowStore};
use flowverse::graph::GraphView;

use super::super::{SearchMatchCache, ViewModel};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

impl ViewModel {
    pub(in crate::app) fn new(document: Document) -> Self {
        let store = FlowStore::new(document);
        let store_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&store_changed);
        let subscription = store.subscribe(move |_| flag.set(true));

        Self {
            store,
            graph: GraphView::default(),
            store_changed,
            _subscription: subscription,
            hidden_flows: HashSet::new(),
            hovered_flow: None,
            selected: None,
            search: String::new(),
            new_element_name: String::new(),
            search_cache: None,
            graph_dirty: true,
            status: None,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        data_path: Option<&Path>,
        reload_requested: &mut bool,
    ) {
        if self.store_changed.replace(false) {
            let document = self.store.document();
            self.hidden_flows
                .retain(|id| document.flows.iter().any(|flow| &flow.id == id));
            if self
                .selected
                .as_deref()
                .is_some_and(|id| document.element(id).is_none())
            {
                self.selected = None;
            }
            self.graph_dirty = true;
        }
        if self.graph_dirty {
            self.sync_graph();
        }
        // Sidebar rows re-assert the hover every frame they are hovered.
        self.hovered_flow = None;

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("FlowVerse");
                    ui.separator();
                    match data_path {
                        Some(path) => ui.label(format!("document: {}", path.display())),
                        None => ui.label("document: sample data"),
                    };
                    let document = self.store.document();
                    ui.label(format!("elements: {}", document.elements.len()));
                    ui.label(format!("flows: {}", document.flows.len()));
                    ui.label(format!("links: {}", self.graph.links().len()));
                    if ui.button("Reheat layout").clicked() {
                        self.graph.reheat();
                    }
                    if ui.button("Reset view").clicked() {
                        self.graph.reset_view();
                    }
                    if ui.button("Reload").clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(status) = &self.status {
                            ui.label(status.as_str());
                        }
                        ui.label(format!("alpha {:.3}", self.graph.alpha()));
                    });
                });
            });

        egui::SidePanel::left("flows")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_controls(ui);
                    ui.separator();
                    self.draw_flow_list(ui);
                });
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        // Panels above may have mutated the store this frame.
        if self.store_changed.get() {
            ctx.request_repaint();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    fn sync_graph(&mut self) {
        let document = self.store.document();
        self.graph
            .set_data(&document.elements, &document.flows, &self.hidden_flows);
        self.graph_dirty = false;
    }

    pub(in crate::app) fn set_flow_hidden(&mut self, flow_id: &str, hidden: bool) {
        let changed = if hidden {
            self.hidden_flows.insert(flow_id.to_owned())
        } else {
            self.hidden_flows.remove(flow_id)
        };
        self.graph_dirty |= changed;
    }

    pub(in crate::app) fn search_matches(&mut self) -> Option<HashSet<String>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let revision = self.store.revision();
        if let Some(cached) = &self.search_cache
            && cached.revision == revision
            && cached.query == query
        {
            return Some(cached.matches.clone());
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .store
            .document()
            .elements
            .iter()
            .filter(|element| fuzzy_match_score(&matcher, &element.name, query).is_some())
            .map(|element| element.id.clone())
            .collect::<HashSet<_>>();

        self.search_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            revision,
            matches: matches.clone(),
        });
        Some(matches)
    }
}
