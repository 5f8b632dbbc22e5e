//! Node Store
//!
//! Column-per-field storage indexed by node identity. Fields known when a node
//! is appended (kind, level, parent, previous sibling, names, value) are
//! written once at append time. `first_child` and `next_sibling` start out
//! [`Link::Unresolved`] and are filled in exactly once as the builder
//! discovers the answer.

use tracing::trace;

use super::{Link, NodeType, MAX_NODES};
use crate::error::DtmError;

/// Everything about a node that is known when it is appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub kind: NodeType,
    pub level: u16,
    pub parent: Option<u32>,
    pub prev_sibling: Option<u32>,
    pub expanded: u32,
    /// Qualified name (string pool id)
    pub name: u32,
    /// Text, attribute value, comment or PI data, namespace URI (string pool id)
    pub value: u32,
}

/// Flat, append-only node columns
#[derive(Debug, Default)]
pub struct NodeStore {
    kind: Vec<NodeType>,
    level: Vec<u16>,
    parent: Vec<Option<u32>>,
    first_child: Vec<Link>,
    next_sibling: Vec<Link>,
    prev_sibling: Vec<Option<u32>>,
    expanded: Vec<u32>,
    name: Vec<u32>,
    value: Vec<u32>,
    limit: usize,
}

impl NodeStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limit(capacity, MAX_NODES)
    }

    /// Store refusing to grow past `limit` identities
    pub fn with_limit(capacity: usize, limit: usize) -> Self {
        let capacity = capacity.min(limit);
        NodeStore {
            kind: Vec::with_capacity(capacity),
            level: Vec::with_capacity(capacity),
            parent: Vec::with_capacity(capacity),
            first_child: Vec::with_capacity(capacity),
            next_sibling: Vec::with_capacity(capacity),
            prev_sibling: Vec::with_capacity(capacity),
            expanded: Vec::with_capacity(capacity),
            name: Vec::with_capacity(capacity),
            value: Vec::with_capacity(capacity),
            limit: limit.min(MAX_NODES),
        }
    }

    /// Append a node, linking it into its parent's child list
    ///
    /// Leaves and attribute-like nodes get `first_child = Absent` at once.
    /// Attribute-like nodes never join the child list; their owner's
    /// `first_child` is left for the next ordinary child to resolve.
    pub fn append(&mut self, record: NodeRecord) -> Result<u32, DtmError> {
        let id = self.kind.len();
        if id >= self.limit {
            return Err(DtmError::CapacityExceeded { limit: self.limit });
        }
        let id = id as u32;
        debug_assert!(record.parent.is_none_or(|p| p < id), "parent must precede child");

        if !record.kind.is_attribute_like() {
            match (record.prev_sibling, record.parent) {
                (Some(prev), _) => self.resolve_next_sibling(prev, Link::Present(id)),
                (None, Some(parent)) => self.resolve_first_child(parent, Link::Present(id)),
                (None, None) => {}
            }
        }

        let leaf = !matches!(record.kind, NodeType::Document | NodeType::Element);
        let attribute_like = record.kind.is_attribute_like();
        self.kind.push(record.kind);
        self.level.push(record.level);
        self.parent.push(record.parent);
        self.first_child.push(if leaf { Link::Absent } else { Link::Unresolved });
        self.next_sibling.push(if attribute_like { Link::Absent } else { Link::Unresolved });
        self.prev_sibling.push(record.prev_sibling);
        self.expanded.push(record.expanded);
        self.name.push(record.name);
        self.value.push(record.value);

        trace!(id, kind = ?record.kind, level = record.level, "append");
        Ok(id)
    }

    /// Fill in `first_child`; resolving a field twice is a builder bug
    pub fn resolve_first_child(&mut self, id: u32, link: Link) {
        let slot = &mut self.first_child[id as usize];
        debug_assert_eq!(*slot, Link::Unresolved, "first_child of {id} resolved twice");
        *slot = link;
    }

    pub fn resolve_next_sibling(&mut self, id: u32, link: Link) {
        let slot = &mut self.next_sibling[id as usize];
        debug_assert_eq!(*slot, Link::Unresolved, "next_sibling of {id} resolved twice");
        *slot = link;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kind.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    #[inline]
    pub fn kind(&self, id: u32) -> NodeType {
        self.kind[id as usize]
    }

    #[inline]
    pub fn level(&self, id: u32) -> u16 {
        self.level[id as usize]
    }

    #[inline]
    pub fn parent(&self, id: u32) -> Option<u32> {
        self.parent[id as usize]
    }

    #[inline]
    pub fn first_child(&self, id: u32) -> Link {
        self.first_child[id as usize]
    }

    #[inline]
    pub fn next_sibling(&self, id: u32) -> Link {
        self.next_sibling[id as usize]
    }

    #[inline]
    pub fn prev_sibling(&self, id: u32) -> Option<u32> {
        self.prev_sibling[id as usize]
    }

    #[inline]
    pub fn expanded(&self, id: u32) -> u32 {
        self.expanded[id as usize]
    }

    #[inline]
    pub fn name(&self, id: u32) -> u32 {
        self.name[id as usize]
    }

    #[inline]
    pub fn value(&self, id: u32) -> u32 {
        self.value[id as usize]
    }
}
