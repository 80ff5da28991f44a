// ── OID prefix tree ──

use std::collections::BTreeMap;

use crate::model::{Oid, Provider};

/// What the database knows about one OID prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MibEntry {
    pub template: String,
    /// Explicit provider column; `None` defers to text heuristics at lookup.
    pub provider: Option<Provider>,
    pub description: String,
}

/// One node of the classifier tree. The root has an empty prefix.
#[derive(Debug, Default)]
pub struct ClassifierNode {
    prefix: Vec<u32>,
    entry: Option<MibEntry>,
    children: BTreeMap<u32, ClassifierNode>,
}

impl ClassifierNode {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn prefix(&self) -> &[u32] {
        &self.prefix
    }

    pub fn entry(&self) -> Option<&MibEntry> {
        self.entry.as_ref()
    }

    /// Attach `entry` at `oid`, creating intermediate nodes as needed.
    /// A later insert at the same prefix replaces the earlier one.
    pub fn insert(&mut self, oid: &Oid, entry: MibEntry) {
        let mut node = self;
        for (depth, &component) in oid.components().iter().enumerate() {
            node = node.children.entry(component).or_insert_with(|| Self {
                prefix: oid.components()[..=depth].to_vec(),
                ..Self::default()
            });
        }
        node.entry = Some(entry);
    }

    /// Walk `oid` from this node and return the deepest visited node
    /// carrying a non-empty template.
    pub fn longest_match(&self, oid: &Oid) -> Option<&Self> {
        let mut best = None;
        let mut node = self;
        for component in oid.components() {
            let Some(child) = node.children.get(component) else {
                break;
            };
            node = child;
            if node.entry.as_ref().is_some_and(|e| !e.template.is_empty()) {
                best = Some(node);
            }
        }
        best
    }

    /// Number of nodes carrying an entry.
    pub fn entry_count(&self) -> usize {
        usize::from(self.entry.is_some())
            + self.children.values().map(Self::entry_count).sum::<usize>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(template: &str) -> MibEntry {
        MibEntry {
            template: template.into(),
            provider: Some(Provider::Router),
            description: String::new(),
        }
    }

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    #[test]
    fn picks_deepest_templated_prefix() {
        let mut root = ClassifierNode::root();
        root.insert(&oid("1.3.6.1.4.1.9"), entry("cisco.yaml"));
        root.insert(&oid("1.3.6.1.4.1.9.1"), entry("cisco-products.yaml"));

        let hit = root.longest_match(&oid("1.3.6.1.4.1.9.1.2494")).unwrap();
        assert_eq!(hit.prefix(), &[1, 3, 6, 1, 4, 1, 9, 1]);
        assert_eq!(hit.entry().unwrap().template, "cisco-products.yaml");

        let hit = root.longest_match(&oid("1.3.6.1.4.1.9.2.7")).unwrap();
        assert_eq!(hit.entry().unwrap().template, "cisco.yaml");
    }

    #[test]
    fn exact_match_counts() {
        let mut root = ClassifierNode::root();
        root.insert(&oid("1.3.6.1.4.1.318"), entry("apc_ups.yaml"));
        let hit = root.longest_match(&oid("1.3.6.1.4.1.318")).unwrap();
        assert_eq!(hit.entry().unwrap().template, "apc_ups.yaml");
    }

    #[test]
    fn empty_templates_are_skipped() {
        let mut root = ClassifierNode::root();
        root.insert(&oid("1.3.6.1.4.1.9"), entry("cisco.yaml"));
        root.insert(&oid("1.3.6.1.4.1.9.1"), entry(""));
        let hit = root.longest_match(&oid("1.3.6.1.4.1.9.1.5")).unwrap();
        assert_eq!(hit.prefix(), &[1, 3, 6, 1, 4, 1, 9]);
    }

    #[test]
    fn no_match_and_counts() {
        let mut root = ClassifierNode::root();
        assert!(root.longest_match(&oid("1.3.6")).is_none());
        root.insert(&oid("1.3.6.1.4.1.9"), entry("cisco.yaml"));
        root.insert(&oid("1.3.6.1.4.1.11"), entry("hp.yaml"));
        assert!(root.longest_match(&oid("1.3.6.1.4.1.2435.2")).is_none());
        assert_eq!(root.entry_count(), 2);
    }
}
