//! DOM Module - externally owned trees a DTM can be built from
//!
//! [`TreeSource`] is the traversal primitive the DOM-pull builder needs:
//! first child, next sibling, parent and a borrowed view of each node.
//! [`SourceTree`] is an arena implementation built from XML text or by hand.

pub mod node;
pub mod tree;

pub use node::{SourceData, SourceId, SourceNode};
pub use tree::SourceTree;

use std::fmt;
use std::sync::Arc;

use crate::sax::{Attribute, NamespaceDecl, QName};

/// Borrowed view of one source node
#[derive(Debug, Clone, Copy)]
pub enum SourceItem<'a> {
    Document,
    Element {
        name: &'a QName,
        namespaces: &'a [NamespaceDecl],
        attributes: &'a [Attribute],
    },
    Text(&'a str),
    CData(&'a str),
    Comment(&'a str),
    ProcessingInstruction {
        target: &'a str,
        data: &'a str,
    },
}

/// A tree the DOM-pull builder can walk
///
/// The root must be a document node. Attributes and namespace declarations
/// travel with their element, not as children.
pub trait TreeSource {
    type Node: Copy + Eq + fmt::Debug + Send;

    fn root(&self) -> Self::Node;

    fn first_child(&self, node: Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn item(&self, node: Self::Node) -> SourceItem<'_>;
}

impl<T: TreeSource + ?Sized> TreeSource for Arc<T> {
    type Node = T::Node;

    fn root(&self) -> Self::Node {
        (**self).root()
    }

    fn first_child(&self, node: Self::Node) -> Option<Self::Node> {
        (**self).first_child(node)
    }

    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        (**self).next_sibling(node)
    }

    fn parent(&self, node: Self::Node) -> Option<Self::Node> {
        (**self).parent(node)
    }

    fn item(&self, node: Self::Node) -> SourceItem<'_> {
        (**self).item(node)
    }
}
