//! Document Table Model
//!
//! A DTM stores an XML tree as flat, identity-indexed columns. Identities are
//! dense, start at 0 (the document node), and are handed out in document
//! order as the builder discovers nodes, so comparing two identities is a
//! document-order comparison.
//!
//! A [`NodeHandle`] folds the owning DTM's id into the high bits of the
//! identity, which keeps handles from different documents distinct and
//! totally ordered.

pub mod builder;
pub mod dispatch;
pub mod document;
pub mod expanded;
pub mod manager;
pub mod navigator;
pub mod store;
pub mod strings;

pub use document::Dtm;
pub use expanded::ExpandedNameTable;
pub use manager::DtmManager;
pub use navigator::Navigator;
pub use store::NodeStore;

use std::fmt;

/// Bits of a handle that hold the node identity
pub const IDENT_NODE_BITS: u32 = 22;
pub const IDENT_NODE_MASK: u32 = (1 << IDENT_NODE_BITS) - 1;
/// Nodes one DTM can address
pub const MAX_NODES: usize = 1 << IDENT_NODE_BITS;
/// Largest DTM id a handle can carry
pub const MAX_DTM_ID: u16 = (1 << (32 - IDENT_NODE_BITS)) - 1;

/// Kinds of node a DTM can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NodeType {
    Document = 0,
    Element = 1,
    Attribute = 2,
    Text = 3,
    CData = 4,
    Comment = 5,
    ProcessingInstruction = 6,
    Namespace = 7,
}

/// Number of node kinds; expanded type ids below this are the unnamed kinds
pub const NODE_TYPE_COUNT: u32 = 8;

impl NodeType {
    pub const ALL: [NodeType; NODE_TYPE_COUNT as usize] = [
        NodeType::Document,
        NodeType::Element,
        NodeType::Attribute,
        NodeType::Text,
        NodeType::CData,
        NodeType::Comment,
        NodeType::ProcessingInstruction,
        NodeType::Namespace,
    ];

    /// Kinds whose expanded type carries a name
    #[inline]
    pub fn is_named(self) -> bool {
        matches!(
            self,
            NodeType::Element | NodeType::Attribute | NodeType::ProcessingInstruction | NodeType::Namespace
        )
    }

    /// Attribute and namespace nodes hang off an element outside its child list
    #[inline]
    pub fn is_attribute_like(self) -> bool {
        matches!(self, NodeType::Attribute | NodeType::Namespace)
    }

    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, NodeType::Text | NodeType::CData)
    }
}

/// A lazily discovered link between two nodes of one DTM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// The builder has not got far enough to know
    Unresolved,
    /// Known to be missing
    Absent,
    Present(u32),
}

impl Link {
    #[inline]
    pub fn is_resolved(self) -> bool {
        !matches!(self, Link::Unresolved)
    }
}

/// Handle of a node: DTM id in the high bits, identity in the low bits
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u32);

impl NodeHandle {
    #[inline]
    pub fn new(dtm_id: u16, identity: u32) -> Self {
        debug_assert!(dtm_id <= MAX_DTM_ID, "dtm id {dtm_id} out of range");
        debug_assert!(identity <= IDENT_NODE_MASK, "identity {identity} out of range");
        NodeHandle((identity & IDENT_NODE_MASK) | ((dtm_id as u32) << IDENT_NODE_BITS))
    }

    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        NodeHandle(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn identity(self) -> u32 {
        self.0 & IDENT_NODE_MASK
    }

    #[inline]
    pub fn dtm_id(self) -> u16 {
        (self.0 >> IDENT_NODE_BITS) as u16
    }

    /// Handle of the node with the same DTM and a different identity
    #[inline]
    pub fn with_identity(self, identity: u32) -> Self {
        NodeHandle::new(self.dtm_id(), identity)
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.dtm_id(), self.identity())
    }
}
