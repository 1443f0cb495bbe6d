mod error;
mod load;
mod model;
mod parse;
mod sample;
mod store;

pub use error::StoreError;
pub use load::load_document;
pub use model::{Document, Element, ElementDraft, Flow, FlowDraft, UNGROUPED};
pub use parse::parse_document;
pub use sample::sample_document;
pub use store::{FlowStore, Subscription};
