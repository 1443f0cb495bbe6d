use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::model::{Document, Element, Flow};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    id: String,
    name: String,
    #[serde(default)]
    is_buggy: bool,
    #[serde(default)]
    bug_details: String,
    #[serde(default)]
    media_link: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlow {
    id: String,
    name: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    methods: Option<Vec<Vec<String>>>,
    #[serde(default)]
    paths: Option<Vec<Vec<String>>>,
    #[serde(default)]
    element_ids: Option<Vec<String>>,
}

impl RawFlow {
    fn normalize(self) -> Flow {
        let methods = self
            .methods
            .or(self.paths)
            .or_else(|| self.element_ids.map(|ids| vec![ids]))
            .unwrap_or_default()
            .into_iter()
            .filter(|method| !method.is_empty())
            .collect();

        Flow {
            id: self.id,
            name: self.name,
            group: self.group.filter(|group| !group.trim().is_empty()),
            methods,
        }
    }
}

fn parse_created_at(value: Option<&Value>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    match value {
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(text)
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or(fallback),
        // Firestore-style `{ seconds, nanoseconds }` timestamps.
        Some(Value::Object(object)) => object
            .get("seconds")
            .and_then(Value::as_i64)
            .and_then(|seconds| {
                let nanos = object
                    .get("nanoseconds")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as u32;
                Utc.timestamp_opt(seconds, nanos).single()
            })
            .unwrap_or(fallback),
        Some(Value::Number(millis)) => millis
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or(fallback),
        _ => fallback,
    }
}

fn normalize_element(raw: RawElement, loaded_at: DateTime<Utc>) -> Element {
    let created_at = parse_created_at(raw.created_at.as_ref(), loaded_at);
    Element {
        id: raw.id,
        name: raw.name,
        is_buggy: raw.is_buggy,
        bug_details: raw.bug_details,
        media_link: raw.media_link.filter(|link| !link.trim().is_empty()),
        created_at,
    }
}

pub fn parse_document(raw: &str) -> Result<Document> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON document")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("document root must be a JSON object"))?;

    let raw_elements = object
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("document is missing an `elements` array"))?;
    let raw_flows = object
        .get("flows")
        .or_else(|| object.get("scenarios"))
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("document is missing a `flows` array"))?;

    let loaded_at = Utc::now();
    let mut elements = Vec::with_capacity(raw_elements.len());
    for (index, value) in raw_elements.iter().enumerate() {
        let raw = RawElement::deserialize(value)
            .with_context(|| format!("invalid element record at index {index}"))?;
        elements.push(normalize_element(raw, loaded_at));
    }

    let mut flows = Vec::with_capacity(raw_flows.len());
    for (index, value) in raw_flows.iter().enumerate() {
        let raw = RawFlow::deserialize(value)
            .with_context(|| format!("invalid flow record at index {index}"))?;
        if raw.id.is_empty() {
            warn!(index, "skipping flow record without an id");
            continue;
        }
        flows.push(raw.normalize());
    }

    Ok(Document { elements, flows })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn legacy_flow_shapes_normalize_to_methods() {
        let raw = r#"{
            "elements": [
                { "id": "1", "name": "Login" },
                { "id": "2", "name": "Dashboard", "isBuggy": true, "bugDetails": "slow" }
            ],
            "flows": [
                { "id": "a", "name": "Old", "elementIds": ["1", "2"] },
                { "id": "b", "name": "Paths", "paths": [["2", "1"], []] },
                { "id": "c", "name": "Current", "methods": [["1"]], "paths": [["2"]] }
            ]
        }"#;

        let document = parse_document(raw).expect("document parses");

        assert_eq!(document.flows[0].methods, vec![vec!["1", "2"]]);
        assert_eq!(document.flows[1].methods, vec![vec!["2", "1"]]);
        assert_eq!(document.flows[2].methods, vec![vec!["1"]]);
        assert!(document.elements[1].is_buggy);
        assert_eq!(document.elements[1].bug_details(), Some("slow"));
        assert_eq!(document.elements[0].bug_details(), None);
    }

    #[test]
    fn scenarios_key_is_accepted() {
        let raw = r#"{ "elements": [], "scenarios": [{ "id": "s", "name": "S", "methods": [] }] }"#;
        let document = parse_document(raw).expect("document parses");
        assert_eq!(document.flows.len(), 1);
        assert_eq!(document.flows[0].group_label(), "Ungrouped");
    }

    #[test]
    fn created_at_accepts_strings_and_timestamps() {
        let fallback = Utc::now();
        let from_string = parse_created_at(
            Some(&Value::String("2024-03-01T10:00:00Z".to_owned())),
            fallback,
        );
        assert_eq!(from_string.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let object = serde_json::json!({ "seconds": 0, "nanoseconds": 0 });
        assert_eq!(parse_created_at(Some(&object), fallback).timestamp(), 0);

        let garbage = Value::String("yesterday".to_owned());
        assert_eq!(parse_created_at(Some(&garbage), fallback), fallback);
    }

    #[test]
    fn missing_arrays_are_rejected() {
        assert!(parse_document(r#"{ "flows": [] }"#).is_err());
        assert!(parse_document(r#"{ "elements": [] }"#).is_err());
        assert!(parse_document("[]").is_err());
    }
}
