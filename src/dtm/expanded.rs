//! Expanded Name Table
//!
//! Interns (namespace URI, local name, node kind) triples into dense ids so
//! that node-test comparisons become integer comparisons. Ids below
//! `NODE_TYPE_COUNT` are reserved: id `k` is the unnamed expanded type of
//! node kind `k`, which is what documents, text, CDATA and comments always get.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use super::strings::StringPool;
use super::{NodeType, NODE_TYPE_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExpandedName {
    namespace: u32,
    local: u32,
    kind: NodeType,
}

/// Dense interning of expanded names, owned by one DTM
#[derive(Debug)]
pub struct ExpandedNameTable {
    entries: Vec<ExpandedName>,
    names: StringPool,
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for ExpandedNameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpandedNameTable {
    pub fn new() -> Self {
        let entries = NodeType::ALL
            .iter()
            .map(|&kind| ExpandedName {
                namespace: 0,
                local: 0,
                kind,
            })
            .collect();
        ExpandedNameTable {
            entries,
            names: StringPool::new(),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(namespace: &str, local: &str, kind: NodeType) -> u64 {
        let mut hasher = DefaultHasher::new();
        namespace.hash(&mut hasher);
        local.hash(&mut hasher);
        kind.hash(&mut hasher);
        hasher.finish()
    }

    fn find(&self, hash: u64, namespace: &str, local: &str, kind: NodeType) -> Option<u32> {
        self.hash_index.get(&hash)?.iter().copied().find(|&id| {
            let entry = self.entries[id as usize];
            entry.kind == kind
                && self.names.get(entry.local) == local
                && self.names.get(entry.namespace) == namespace
        })
    }

    /// Intern an expanded name, creating it on first encounter
    ///
    /// Unnamed kinds, and named kinds given an empty local name, map to the
    /// reserved id of their kind.
    pub fn expanded_type_id(&mut self, namespace: &str, local: &str, kind: NodeType) -> u32 {
        if !kind.is_named() || (local.is_empty() && namespace.is_empty()) {
            return kind as u32;
        }
        let hash = Self::compute_hash(namespace, local, kind);
        if let Some(id) = self.find(hash, namespace, local, kind) {
            return id;
        }
        let entry = ExpandedName {
            namespace: self.names.intern(namespace),
            local: self.names.intern(local),
            kind,
        };
        let id = self.entries.len() as u32;
        self.entries.push(entry);
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Id of an expanded name without interning it
    pub fn lookup(&self, namespace: &str, local: &str, kind: NodeType) -> Option<u32> {
        if !kind.is_named() || (local.is_empty() && namespace.is_empty()) {
            return Some(kind as u32);
        }
        self.find(Self::compute_hash(namespace, local, kind), namespace, local, kind)
    }

    #[inline]
    pub fn local_name(&self, id: u32) -> &str {
        self.entries.get(id as usize).map_or("", |e| self.names.get(e.local))
    }

    #[inline]
    pub fn namespace(&self, id: u32) -> &str {
        self.entries.get(id as usize).map_or("", |e| self.names.get(e.namespace))
    }

    /// Node kind of an expanded type; ids are never handed out without one
    #[inline]
    pub fn node_type(&self, id: u32) -> NodeType {
        self.entries[id as usize].kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only the reserved kind ids exist
    pub fn is_empty(&self) -> bool {
        self.entries.len() as u32 == NODE_TYPE_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ids() {
        let mut table = ExpandedNameTable::new();
        assert!(table.is_empty());
        assert_eq!(table.expanded_type_id("", "", NodeType::Text), NodeType::Text as u32);
        assert_eq!(table.expanded_type_id("urn:x", "ignored", NodeType::Comment), NodeType::Comment as u32);
        assert_eq!(table.node_type(NodeType::Document as u32), NodeType::Document);
        assert_eq!(table.local_name(NodeType::Text as u32), "");
    }

    #[test]
    fn test_interning_is_stable() {
        let mut table = ExpandedNameTable::new();
        let a = table.expanded_type_id("urn:x", "item", NodeType::Element);
        let b = table.expanded_type_id("urn:x", "item", NodeType::Element);
        assert_eq!(a, b);
        assert!(a >= NODE_TYPE_COUNT);
        assert_eq!(table.local_name(a), "item");
        assert_eq!(table.namespace(a), "urn:x");
        assert_eq!(table.node_type(a), NodeType::Element);
    }

    #[test]
    fn test_kind_and_namespace_distinguish() {
        let mut table = ExpandedNameTable::new();
        let element = table.expanded_type_id("", "id", NodeType::Element);
        let attribute = table.expanded_type_id("", "id", NodeType::Attribute);
        let namespaced = table.expanded_type_id("urn:y", "id", NodeType::Element);
        assert_ne!(element, attribute);
        assert_ne!(element, namespaced);
        assert_eq!(table.len(), NODE_TYPE_COUNT as usize + 3);
    }

    #[test]
    fn test_lookup() {
        let mut table = ExpandedNameTable::new();
        assert_eq!(table.lookup("", "a", NodeType::Element), None);
        let id = table.expanded_type_id("", "a", NodeType::Element);
        assert_eq!(table.lookup("", "a", NodeType::Element), Some(id));
        assert_eq!(table.lookup("", "", NodeType::Text), Some(NodeType::Text as u32));
    }
}
