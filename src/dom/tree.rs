//! Arena source tree
//!
//! Node 0 is always the document. Trees are built by hand with
//! [`SourceTree::append_child`] or from XML text, in which case adjacent
//! character data is merged into one text node.

use super::node::{SourceData, SourceId, SourceNode};
use super::{SourceItem, TreeSource};
use crate::core::XmlEventReader;
use crate::error::DtmError;
use crate::sax::{Attribute, ContentHandler, NamespaceDecl, QName};

#[derive(Debug, Clone)]
pub struct SourceTree {
    nodes: Vec<SourceNode>,
}

impl Default for SourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTree {
    /// Tree holding just a document node
    pub fn new() -> Self {
        SourceTree {
            nodes: vec![SourceNode::new(SourceData::Document, None)],
        }
    }

    /// Parse XML text into a tree
    pub fn parse(xml: &str, strict: bool) -> Result<Self, DtmError> {
        let mut builder = TreeBuilder::new();
        XmlEventReader::new(xml).strict(strict).drive(&mut builder)?;
        Ok(builder.tree)
    }

    #[inline]
    pub fn root_id(&self) -> SourceId {
        SourceId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Append a node as the last child of `parent`
    pub fn append_child(&mut self, parent: SourceId, data: SourceData) -> SourceId {
        let id = SourceId(self.nodes.len() as u32);
        self.nodes.push(SourceNode::new(data, Some(parent)));
        self.link_child(parent, id);
        id
    }

    fn link_child(&mut self, parent: SourceId, child: SourceId) {
        let last_child = self.nodes[parent.0 as usize].last_child;
        if let Some(last) = last_child {
            self.nodes[child.0 as usize].prev_sibling = Some(last);
            self.nodes[last.0 as usize].next_sibling = Some(child);
        } else {
            self.nodes[parent.0 as usize].first_child = Some(child);
        }
        self.nodes[parent.0 as usize].last_child = Some(child);
    }

    /// Re-point a node's first child; building a malformed tree on purpose is
    /// how the DOM-pull consistency checks get exercised
    pub fn set_first_child(&mut self, node: SourceId, child: Option<SourceId>) {
        self.nodes[node.0 as usize].first_child = child;
    }

    /// Re-point a node's next sibling, for the same purpose
    pub fn set_next_sibling(&mut self, node: SourceId, sibling: Option<SourceId>) {
        self.nodes[node.0 as usize].next_sibling = sibling;
    }
}

impl TreeSource for SourceTree {
    type Node = SourceId;

    fn root(&self) -> SourceId {
        SourceId(0)
    }

    fn first_child(&self, node: SourceId) -> Option<SourceId> {
        self.nodes[node.0 as usize].first_child
    }

    fn next_sibling(&self, node: SourceId) -> Option<SourceId> {
        self.nodes[node.0 as usize].next_sibling
    }

    fn parent(&self, node: SourceId) -> Option<SourceId> {
        self.nodes[node.0 as usize].parent
    }

    fn item(&self, node: SourceId) -> SourceItem<'_> {
        self.nodes[node.0 as usize].data.as_item()
    }
}

/// Builds a [`SourceTree`] from pushed events
struct TreeBuilder {
    tree: SourceTree,
    stack: Vec<SourceId>,
}

impl TreeBuilder {
    fn new() -> Self {
        let tree = SourceTree::new();
        let root = tree.root_id();
        TreeBuilder {
            tree,
            stack: vec![root],
        }
    }

    fn current(&self) -> SourceId {
        self.stack.last().copied().unwrap_or(SourceId(0))
    }
}

impl ContentHandler for TreeBuilder {
    fn start_element(
        &mut self,
        name: &QName,
        namespaces: &[NamespaceDecl],
        attributes: &[Attribute],
    ) -> Result<(), DtmError> {
        let data = SourceData::Element {
            name: name.clone(),
            namespaces: namespaces.to_vec(),
            attributes: attributes.to_vec(),
        };
        let id = self.tree.append_child(self.current(), data);
        self.stack.push(id);
        Ok(())
    }

    fn end_element(&mut self, _name: &QName) -> Result<(), DtmError> {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), DtmError> {
        let parent = self.current();
        if let Some(last) = self.tree.nodes[parent.0 as usize].last_child {
            if let SourceData::Text(existing) = &mut self.tree.nodes[last.0 as usize].data {
                existing.push_str(text);
                return Ok(());
            }
        }
        self.tree.append_child(parent, SourceData::Text(text.to_string()));
        Ok(())
    }

    fn cdata(&mut self, text: &str) -> Result<(), DtmError> {
        self.tree.append_child(self.current(), SourceData::CData(text.to_string()));
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<(), DtmError> {
        self.tree.append_child(self.current(), SourceData::Comment(text.to_string()));
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), DtmError> {
        let node = SourceData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        };
        self.tree.append_child(self.current(), node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_links() {
        let tree = SourceTree::parse("<a x='1'><b/>text<c/></a>", false).unwrap();
        assert_eq!(tree.len(), 5);
        let a = tree.first_child(tree.root()).unwrap();
        let b = tree.first_child(a).unwrap();
        let text = tree.next_sibling(b).unwrap();
        assert!(matches!(tree.item(text), SourceItem::Text("text")));
        let c = tree.next_sibling(text).unwrap();
        assert_eq!(tree.parent(c), Some(a));
        assert_eq!(tree.next_sibling(c), None);
        match tree.item(a) {
            SourceItem::Element { attributes, .. } => assert_eq!(attributes.len(), 1),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_manual_construction() {
        let mut tree = SourceTree::new();
        let root = tree.root_id();
        let a = tree.append_child(root, SourceData::element(QName::local("a")));
        let b = tree.append_child(a, SourceData::Comment("b".into()));
        let c = tree.append_child(a, SourceData::Comment("c".into()));
        assert_eq!(tree.get(c).and_then(|n| n.prev_sibling), Some(b));
        assert!(tree.get(a).is_some_and(|n| n.is_element()));
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_strict_parse_error() {
        assert!(SourceTree::parse("<a><b></a>", true).is_err());
    }
}
