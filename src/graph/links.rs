use std::collections::{HashMap, HashSet};

use crate::flow::{Element, Flow};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub flow_id: String,
    pub flow_name: String,
    pub method_index: usize,
    pub source: String,
    pub target: String,
    pub parallel_index: usize,
    pub parallel_total: usize,
}

impl Link {
    pub fn pair_key(&self) -> (&str, &str) {
        if self.source <= self.target {
            (self.source.as_str(), self.target.as_str())
        } else {
            (self.target.as_str(), self.source.as_str())
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.source > self.target
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

pub fn derive_links(elements: &[Element], flows: &[Flow], hidden: &HashSet<String>) -> Vec<Link> {
    let known = elements
        .iter()
        .map(|element| element.id.as_str())
        .collect::<HashSet<_>>();

    let mut links = Vec::new();
    for flow in flows {
        if flow.id.is_empty() || hidden.contains(&flow.id) {
            continue;
        }

        for (method_index, method) in flow.methods.iter().enumerate() {
            for pair in method.windows(2) {
                let [source, target] = pair else {
                    continue;
                };
                if !known.contains(source.as_str()) || !known.contains(target.as_str()) {
                    continue;
                }

                links.push(Link {
                    flow_id: flow.id.clone(),
                    flow_name: flow.name.clone(),
                    method_index,
                    source: source.clone(),
                    target: target.clone(),
                    parallel_index: 0,
                    parallel_total: 1,
                });
            }
        }
    }

    bundle_parallel(&mut links);
    links
}

fn bundle_parallel(links: &mut [Link]) {
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    let mut keys = Vec::with_capacity(links.len());

    for link in links.iter_mut() {
        let (low, high) = link.pair_key();
        let key = (low.to_owned(), high.to_owned());
        let count = seen.entry(key.clone()).or_insert(0);
        link.parallel_index = *count;
        *count += 1;
        keys.push(key);
    }

    for (link, key) in links.iter_mut().zip(keys) {
        link.parallel_total = seen.get(&key).copied().unwrap_or(1);
    }
}
