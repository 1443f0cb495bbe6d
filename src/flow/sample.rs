use chrono::Utc;

use super::model::{Document, Element, Flow};

fn element(id: &str, name: &str, bug_details: Option<&str>) -> Element {
    Element {
        id: id.to_owned(),
        name: name.to_owned(),
        is_buggy: bug_details.is_some(),
        bug_details: bug_details.unwrap_or_default().to_owned(),
        media_link: None,
        created_at: Utc::now(),
    }
}

fn flow(id: &str, name: &str, group: &str, methods: &[&[&str]]) -> Flow {
    Flow {
        id: id.to_owned(),
        name: name.to_owned(),
        group: Some(group.to_owned()),
        methods: methods
            .iter()
            .map(|method| method.iter().map(|id| (*id).to_owned()).collect())
            .collect(),
    }
}

pub fn sample_document() -> Document {
    Document {
        elements: vec![
            element("1", "Login Dialog", None),
            element("2", "Dashboard", Some("Metrics not loading correctly.")),
            element("3", "Settings Page", None),
            element("4", "User Profile", None),
            element("5", "Forgot Password", None),
        ],
        flows: vec![
            flow("101", "User Login", "Onboarding", &[&["1", "2"], &["5", "1"]]),
            flow("102", "Profile Update", "User Management", &[&["2", "3", "4"]]),
            flow("103", "View Settings", "User Management", &[&["2", "3"]]),
        ],
    }
}
