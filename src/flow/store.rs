use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use chrono::Utc;
use tracing::{debug, info};

use super::error::StoreError;
use super::model::{Document, Element, ElementDraft, Flow, FlowDraft};

type Listener = Box<dyn FnMut(&Document)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
    // Ids dropped while their entries were checked out for notification.
    removed: Vec<u64>,
}

/// Handle returned by [`FlowStore::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let Ok(mut listeners) = listeners.try_borrow_mut() else {
            return;
        };

        let before = listeners.entries.len();
        listeners.entries.retain(|(id, _)| *id != self.id);
        if listeners.entries.len() == before {
            listeners.removed.push(self.id);
        }
    }
}

pub struct FlowStore {
    document: Document,
    revision: u64,
    last_id: i64,
    listeners: Rc<RefCell<Listeners>>,
}

fn validate_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        Err(StoreError::EmptyName)
    } else {
        Ok(name.to_owned())
    }
}

impl FlowStore {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            revision: 0,
            last_id: 0,
            listeners: Rc::new(RefCell::new(Listeners::default())),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&self, listener: impl FnMut(&Document) + 'static) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Box::new(listener)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    fn commit(&mut self, change: &str) {
        self.revision = self.revision.wrapping_add(1);
        debug!(revision = self.revision, change, "flow store changed");

        let mut checked_out = std::mem::take(&mut self.listeners.borrow_mut().entries);
        for (_, listener) in &mut checked_out {
            listener(&self.document);
        }

        let mut listeners = self.listeners.borrow_mut();
        let removed = std::mem::take(&mut listeners.removed);
        checked_out.retain(|(id, _)| !removed.contains(id));
        checked_out.append(&mut listeners.entries);
        listeners.entries = checked_out;
    }

    fn fresh_id(&mut self) -> String {
        let mut candidate = Utc::now().timestamp_millis().max(self.last_id + 1);
        loop {
            let id = candidate.to_string();
            let taken = self.document.elements.iter().any(|element| element.id == id)
                || self.document.flows.iter().any(|flow| flow.id == id);
            if !taken {
                self.last_id = candidate;
                return id;
            }
            candidate += 1;
        }
    }

    fn ensure_unique_element_name(&self, name: &str, except: Option<&str>) -> Result<(), StoreError> {
        let lowered = name.to_lowercase();
        let taken = self.document.elements.iter().any(|element| {
            element.name.to_lowercase() == lowered && Some(element.id.as_str()) != except
        });
        if taken {
            Err(StoreError::DuplicateElementName(name.to_owned()))
        } else {
            Ok(())
        }
    }

    fn ensure_unique_flow_name(&self, name: &str, except: Option<&str>) -> Result<(), StoreError> {
        let lowered = name.to_lowercase();
        let taken = self
            .document
            .flows
            .iter()
            .any(|flow| flow.name.to_lowercase() == lowered && Some(flow.id.as_str()) != except);
        if taken {
            Err(StoreError::DuplicateFlowName(name.to_owned()))
        } else {
            Ok(())
        }
    }

    fn validate_method(&self, method: &[String]) -> Result<(), StoreError> {
        if method.is_empty() {
            return Err(StoreError::EmptyMethod);
        }
        let known = self
            .document
            .elements
            .iter()
            .map(|element| element.id.as_str())
            .collect::<HashSet<_>>();
        match method.iter().find(|id| !known.contains(id.as_str())) {
            Some(unknown) => Err(StoreError::UnknownElement(unknown.clone())),
            None => Ok(()),
        }
    }

    fn flow_mut(&mut self, flow_id: &str) -> Result<&mut Flow, StoreError> {
        self.document
            .flows
            .iter_mut()
            .find(|flow| flow.id == flow_id)
            .ok_or_else(|| StoreError::UnknownFlow(flow_id.to_owned()))
    }

    pub fn add_element(&mut self, draft: ElementDraft) -> Result<String, StoreError> {
        let name = validate_name(&draft.name)?;
        self.ensure_unique_element_name(&name, None)?;

        let id = self.fresh_id();
        self.document.elements.push(Element {
            id: id.clone(),
            name,
            is_buggy: draft.is_buggy,
            bug_details: draft.bug_details,
            media_link: draft.media_link.filter(|link| !link.trim().is_empty()),
            created_at: Utc::now(),
        });
        info!(id = id.as_str(), "element added");
        self.commit("add_element");
        Ok(id)
    }

    pub fn update_element(&mut self, id: &str, draft: ElementDraft) -> Result<(), StoreError> {
        let name = validate_name(&draft.name)?;
        self.ensure_unique_element_name(&name, Some(id))?;

        let element = self
            .document
            .elements
            .iter_mut()
            .find(|element| element.id == id)
            .ok_or_else(|| StoreError::UnknownElement(id.to_owned()))?;
        element.name = name;
        element.is_buggy = draft.is_buggy;
        element.bug_details = draft.bug_details;
        element.media_link = draft.media_link.filter(|link| !link.trim().is_empty());
        self.commit("update_element");
        Ok(())
    }

    /// Removes the element and every reference to it. Methods left empty are
    /// dropped, then flows left without methods.
    pub fn delete_element(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.document.elements.len();
        self.document.elements.retain(|element| element.id != id);
        if self.document.elements.len() == before {
            return Err(StoreError::UnknownElement(id.to_owned()));
        }

        let flows_before = self.document.flows.len();
        for flow in &mut self.document.flows {
            for method in &mut flow.methods {
                method.retain(|element_id| element_id != id);
            }
            flow.methods.retain(|method| !method.is_empty());
        }
        self.document.flows.retain(|flow| !flow.methods.is_empty());

        info!(
            id,
            dropped_flows = flows_before - self.document.flows.len(),
            "element deleted"
        );
        self.commit("delete_element");
        Ok(())
    }

    pub fn add_flow(&mut self, draft: FlowDraft) -> Result<String, StoreError> {
        let name = validate_name(&draft.name)?;
        self.ensure_unique_flow_name(&name, None)?;
        for method in &draft.methods {
            self.validate_method(method)?;
        }

        let id = self.fresh_id();
        self.document.flows.push(Flow {
            id: id.clone(),
            name,
            group: draft.group.filter(|group| !group.trim().is_empty()),
            methods: draft.methods,
        });
        info!(id = id.as_str(), "flow added");
        self.commit("add_flow");
        Ok(id)
    }

    pub fn update_flow(&mut self, id: &str, draft: FlowDraft) -> Result<(), StoreError> {
        let name = validate_name(&draft.name)?;
        self.ensure_unique_flow_name(&name, Some(id))?;
        for method in &draft.methods {
            self.validate_method(method)?;
        }

        let flow = self.flow_mut(id)?;
        flow.name = name;
        flow.group = draft.group.filter(|group| !group.trim().is_empty());
        flow.methods = draft.methods;
        self.commit("update_flow");
        Ok(())
    }

    pub fn delete_flow(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.document.flows.len();
        self.document.flows.retain(|flow| flow.id != id);
        if self.document.flows.len() == before {
            return Err(StoreError::UnknownFlow(id.to_owned()));
        }
        info!(id, "flow deleted");
        self.commit("delete_flow");
        Ok(())
    }

    pub fn add_method(&mut self, flow_id: &str, method: Vec<String>) -> Result<usize, StoreError> {
        self.validate_method(&method)?;
        let flow = self.flow_mut(flow_id)?;
        flow.methods.push(method);
        let index = flow.methods.len() - 1;
        self.commit("add_method");
        Ok(index)
    }

    pub fn replace_method(
        &mut self,
        flow_id: &str,
        index: usize,
        method: Vec<String>,
    ) -> Result<(), StoreError> {
        self.validate_method(&method)?;
        let flow = self.flow_mut(flow_id)?;
        let slot = flow
            .methods
            .get_mut(index)
            .ok_or_else(|| StoreError::UnknownMethod {
                flow_id: flow_id.to_owned(),
                index,
            })?;
        *slot = method;
        self.commit("replace_method");
        Ok(())
    }

    pub fn remove_method(&mut self, flow_id: &str, index: usize) -> Result<Vec<String>, StoreError> {
        let flow = self.flow_mut(flow_id)?;
        if index >= flow.methods.len() {
            return Err(StoreError::UnknownMethod {
                flow_id: flow_id.to_owned(),
                index,
            });
        }
        let removed = flow.methods.remove(index);
        self.commit("remove_method");
        Ok(removed)
    }
}
