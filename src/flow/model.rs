use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNGROUPED: &str = "Ungrouped";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    pub name: String,
    pub is_buggy: bool,
    pub bug_details: String,
    pub media_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Element {
    pub fn bug_details(&self) -> Option<&str> {
        if self.is_buggy && !self.bug_details.trim().is_empty() {
            Some(self.bug_details.as_str())
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
    pub methods: Vec<Vec<String>>,
}

impl Flow {
    pub fn group_label(&self) -> &str {
        self.group
            .as_deref()
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .unwrap_or(UNGROUPED)
    }

    pub fn references(&self, element_id: &str) -> bool {
        self.methods
            .iter()
            .any(|method| method.iter().any(|id| id == element_id))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub elements: Vec<Element>,
    pub flows: Vec<Flow>,
}

impl Document {
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|element| element.id == id)
    }

    pub fn flow(&self, id: &str) -> Option<&Flow> {
        self.flows.iter().find(|flow| flow.id == id)
    }

    pub fn flows_referencing<'a>(&'a self, element_id: &'a str) -> impl Iterator<Item = &'a Flow> {
        self.flows
            .iter()
            .filter(move |flow| flow.references(element_id))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementDraft {
    pub name: String,
    pub is_buggy: bool,
    pub bug_details: String,
    pub media_link: Option<String>,
}

impl From<&Element> for ElementDraft {
    fn from(element: &Element) -> Self {
        Self {
            name: element.name.clone(),
            is_buggy: element.is_buggy,
            bug_details: element.bug_details.clone(),
            media_link: element.media_link.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowDraft {
    pub name: String,
    pub group: Option<String>,
    pub methods: Vec<Vec<String>>,
}

impl From<&Flow> for FlowDraft {
    fn from(flow: &Flow) -> Self {
        Self {
            name: flow.name.clone(),
            group: flow.group.clone(),
            methods: flow.methods.clone(),
        }
    }
}
