use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::model::Document;
use super::parse::parse_document;

pub fn load_document(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read document {}", path.display()))?;
    let document = parse_document(&raw)
        .with_context(|| format!("failed to parse document {}", path.display()))?;

    info!(
        path = %path.display(),
        elements = document.elements.len(),
        flows = document.flows.len(),
        "loaded flow document"
    );
    Ok(document)
}
