use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("an element named \"{0}\" already exists")]
    DuplicateElementName(String),
    #[error("a flow named \"{0}\" already exists")]
    DuplicateFlowName(String),
    #[error("unknown element id {0}")]
    UnknownElement(String),
    #[error("unknown flow id {0}")]
    UnknownFlow(String),
    #[error("flow {flow_id} has no method at index {index}")]
    UnknownMethod { flow_id: String, index: usize },
    #[error("a method needs at least one element")]
    EmptyMethod,
    #[error("name must not be empty")]
    EmptyName,
}
