pub mod flow;
pub mod graph;
pub mod util;
