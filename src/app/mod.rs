use std::cell::Cell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{info, warn};

use flowverse::flow::{Document, FlowStore, Subscription, load_document, sample_document};
use flowverse::graph::GraphView;

mod canvas;
mod ui;

pub struct FlowverseApp {
    data_path: Option<PathBuf>,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Document, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    store: FlowStore,
    graph: GraphView,
    // Set by the store subscription, cleared once the graph caught up.
    store_changed: Rc<Cell<bool>>,
    _subscription: Subscription,
    hidden_flows: HashSet<String>,
    hovered_flow: Option<String>,
    selected: Option<String>,
    search: String,
    new_element_name: String,
    search_cache: Option<SearchMatchCache>,
    graph_dirty: bool,
    status: Option<String>,
}

struct SearchMatchCache {
    query: String,
    revision: u64,
    matches: HashSet<String>,
}

impl FlowverseApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, data_path: Option<PathBuf>) -> Self {
        let state = Self::start_load(data_path.clone());
        Self { data_path, state }
    }

    fn spawn_load(data_path: Option<PathBuf>) -> Receiver<Result<Document, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = match data_path {
                Some(path) => load_document(&path).map_err(|error| format!("{error:#}")),
                None => Ok(sample_document()),
            };
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(data_path: Option<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(data_path),
        }
    }

    fn leave_state(&mut self, next: AppState) {
        if let AppState::Ready(model) = &mut self.state {
            model.graph.teardown();
        }
        self.state = next;
    }
}

impl eframe::App for FlowverseApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(document)) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(document))));
                    }
                    Ok(Err(error)) => {
                        warn!(%error, "document load failed");
                        transition = Some(AppState::Error(error));
                    }
                    Err(mpsc::TryRecvError::Empty) => ctx.request_repaint(),
                    Err(mpsc::TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading flow document...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load flow document");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.data_path.clone()));
                    }
                    if ui.button("Open sample data").clicked() {
                        transition = Some(Self::start_load(None));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                model.show(ctx, self.data_path.as_deref(), &mut reload_requested);
                if reload_requested {
                    info!("reloading flow document");
                    transition = Some(Self::start_load(self.data_path.clone()));
                }
            }
        }

        if let Some(next_state) = transition {
            self.leave_state(next_state);
        }
    }
}

impl Drop for FlowverseApp {
    fn drop(&mut self) {
        if let AppState::Ready(model) = &mut self.state {
            model.graph.teardown();
        }
    }
}
