//! Source tree nodes
//!
//! Uses SourceId (u32) for compact, cache-friendly node references.

use super::SourceItem;
use crate::sax::{Attribute, NamespaceDecl, QName};

/// Index into a [`SourceTree`](super::SourceTree) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

/// Payload of a source node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceData {
    Document,
    Element {
        name: QName,
        namespaces: Vec<NamespaceDecl>,
        attributes: Vec<Attribute>,
    },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

impl SourceData {
    /// Element with no attributes or namespace declarations
    pub fn element(name: QName) -> Self {
        SourceData::Element {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn as_item(&self) -> SourceItem<'_> {
        match self {
            SourceData::Document => SourceItem::Document,
            SourceData::Element {
                name,
                namespaces,
                attributes,
            } => SourceItem::Element {
                name,
                namespaces,
                attributes,
            },
            SourceData::Text(text) => SourceItem::Text(text),
            SourceData::CData(text) => SourceItem::CData(text),
            SourceData::Comment(text) => SourceItem::Comment(text),
            SourceData::ProcessingInstruction { target, data } => {
                SourceItem::ProcessingInstruction { target, data }
            }
        }
    }
}

/// An arena node with parent/child/sibling links
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub data: SourceData,
    pub parent: Option<SourceId>,
    pub first_child: Option<SourceId>,
    pub last_child: Option<SourceId>,
    pub prev_sibling: Option<SourceId>,
    pub next_sibling: Option<SourceId>,
}

impl SourceNode {
    pub fn new(data: SourceData, parent: Option<SourceId>) -> Self {
        SourceNode {
            data,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, SourceData::Element { .. })
    }
}
