mod geometry;
mod interaction;
mod links;
mod palette;
mod scene;
mod simulation;
mod view;

pub use geometry::{
    EdgePath, EdgeSpec, RADIUS_RANGE, RadiusScale, TOTAL_SHIFT, edge_path, parallel_offset,
    usage_counts,
};
pub use interaction::{
    DRAG_THRESHOLD, GestureStep, GestureTracker, InteractionEvent, MAX_SCALE, MIN_SCALE,
    ViewTransform, hit_edge, hit_node,
};
pub use links::{Link, derive_links};
pub use palette::{CATEGORY10, FlowPalette, blend_color, dim_color};
pub use scene::{DrawCommand, SceneInput, SceneStyle, edge_paths, render};
pub use simulation::{NodeSeed, SimNode, Simulation, SimulationConfig};
pub use view::GraphView;
