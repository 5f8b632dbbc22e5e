//! Handle-addressed read API
//!
//! Axis iterators and path walkers are written against [`Navigator`], which
//! both a single [`Dtm`](super::Dtm) and a [`DtmManager`](super::DtmManager)
//! implement. Calls that may need more of the document to be built take
//! `&mut self` and can fail; calls answered from fields fixed at append time
//! take `&self`.
//!
//! Handles passed in must have come out of the same navigator. A handle for a
//! node that does not exist is a caller bug and panics.

use super::{NodeHandle, NodeType};
use crate::error::DtmError;

pub trait Navigator {
    fn first_child(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError>;

    /// Next node in the parent's child list; attribute and namespace nodes have none
    fn next_sibling(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError>;

    /// The node whose identity follows `node`'s, in document order
    fn node_after(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError>;

    /// XPath string-value: concatenated descendant text for documents and
    /// elements, the stored value for everything else
    fn string_value(&mut self, node: NodeHandle) -> Result<String, DtmError>;

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;

    /// The node whose identity precedes `node`'s
    fn node_before(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn node_type(&self, node: NodeHandle) -> NodeType;

    /// Number of ancestors
    fn level(&self, node: NodeHandle) -> u16;

    /// Expanded type id in the owning DTM's name table
    fn expanded_type(&self, node: NodeHandle) -> u32;

    fn local_name(&self, node: NodeHandle) -> &str;

    fn namespace_uri(&self, node: NodeHandle) -> &str;

    /// Qualified name, PI target, namespace prefix, or a `#kind` name
    fn node_name(&self, node: NodeHandle) -> &str;

    /// Stored value of a leaf, attribute or namespace node; empty for containers
    fn node_value(&self, node: NodeHandle) -> &str;

    /// True when `later` comes strictly after `node` in document order
    fn is_node_after(&self, node: NodeHandle, later: NodeHandle) -> bool {
        node < later
    }

    /// Document node of the DTM owning `node`
    fn document(&self, node: NodeHandle) -> NodeHandle {
        node.with_identity(0)
    }
}
