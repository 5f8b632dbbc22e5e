//! Tree-walk strategy
//!
//! Depth-first walk over a [`TreeSource`] using only first-child,
//! next-sibling and parent. Every step checks that the source agrees with
//! itself about parentage. The appender's depth limit stops a first-child
//! cycle; a next-sibling cycle is caught with Brent's cycle detection, kept
//! per open level so it costs a few words of state.

use super::{Appender, BuildStrategy, BuildTarget};
use crate::config::DtmConfig;
use crate::dom::{SourceItem, TreeSource};
use crate::dtm::NodeType;
use crate::error::DtmError;

#[derive(Debug, Clone, Copy)]
enum Position<N> {
    Start,
    At(N),
    Done,
}

/// Cycle watch over one sibling chain
#[derive(Debug, Clone, Copy)]
struct SiblingWatch<N> {
    mark: N,
    power: usize,
    steps: usize,
}

impl<N: Copy + Eq> SiblingWatch<N> {
    fn new(first: N) -> Self {
        SiblingWatch {
            mark: first,
            power: 1,
            steps: 0,
        }
    }

    /// Record the next sibling; `true` when the chain has come back around
    fn step(&mut self, next: N) -> bool {
        if next == self.mark {
            return true;
        }
        self.steps += 1;
        if self.steps == self.power {
            self.mark = next;
            self.power *= 2;
            self.steps = 0;
        }
        false
    }
}

/// Builds from a [`TreeSource`] one node at a time
pub struct DomPull<T: TreeSource> {
    tree: T,
    appender: Appender,
    root: Option<T::Node>,
    position: Position<T::Node>,
    /// One watch per open level, innermost last
    chains: Vec<SiblingWatch<T::Node>>,
}

impl<T: TreeSource> DomPull<T> {
    pub fn new(tree: T, config: &DtmConfig) -> Self {
        DomPull {
            tree,
            appender: Appender::new(config),
            root: None,
            position: Position::Start,
            chains: Vec::new(),
        }
    }

    fn child_of(&self, parent: T::Node, child: T::Node) -> Result<T::Node, DtmError> {
        if self.tree.parent(child) == Some(parent) {
            Ok(child)
        } else {
            Err(DtmError::InconsistentSource(format!(
                "{child:?} is listed under {parent:?} but names another parent"
            )))
        }
    }

    fn begin(&mut self, target: &mut BuildTarget<'_>) -> Result<(), DtmError> {
        let root = self.tree.root();
        if !matches!(self.tree.item(root), SourceItem::Document) {
            return Err(DtmError::InconsistentSource("tree root is not a document node".into()));
        }
        self.root = Some(root);
        self.appender.start_document(target)?;
        self.position = match self.tree.first_child(root) {
            Some(child) => {
                self.chains.push(SiblingWatch::new(child));
                Position::At(self.child_of(root, child)?)
            }
            None => {
                self.appender.end_document(target)?;
                Position::Done
            }
        };
        Ok(())
    }

    fn visit(&mut self, node: T::Node, target: &mut BuildTarget<'_>) -> Result<(), DtmError> {
        match self.tree.item(node) {
            SourceItem::Document => {
                return Err(DtmError::InconsistentSource(format!("document node {node:?} below the root")));
            }
            SourceItem::Element {
                name,
                namespaces,
                attributes,
            } => {
                self.appender.start_element(target, name, namespaces, attributes)?;
                if let Some(child) = self.tree.first_child(node) {
                    self.chains.push(SiblingWatch::new(child));
                    self.position = Position::At(self.child_of(node, child)?);
                    return Ok(());
                }
                self.appender.end_element(target)?;
            }
            SourceItem::Text(text) => self.appender.characters(text)?,
            SourceItem::CData(text) => self.appender.leaf(target, NodeType::CData, "", "", text)?,
            SourceItem::Comment(text) => self.appender.leaf(target, NodeType::Comment, "", "", text)?,
            SourceItem::ProcessingInstruction { target: pi, data } => {
                self.appender.leaf(target, NodeType::ProcessingInstruction, pi, pi, data)?
            }
        }
        self.advance(node, target)
    }

    /// Move past `node`: its next sibling, or the first ancestor sibling,
    /// closing every element left behind
    fn advance(&mut self, mut node: T::Node, target: &mut BuildTarget<'_>) -> Result<(), DtmError> {
        loop {
            let parent = self
                .tree
                .parent(node)
                .ok_or_else(|| DtmError::InconsistentSource(format!("{node:?} has no parent")))?;
            if let Some(sibling) = self.tree.next_sibling(node) {
                if self.chains.last_mut().is_some_and(|chain| chain.step(sibling)) {
                    return Err(DtmError::InconsistentSource(format!(
                        "sibling chain under {parent:?} loops back to {sibling:?}"
                    )));
                }
                self.position = Position::At(self.child_of(parent, sibling)?);
                return Ok(());
            }
            self.chains.pop();
            if Some(parent) == self.root {
                self.appender.end_document(target)?;
                self.position = Position::Done;
                return Ok(());
            }
            self.appender.end_element(target)?;
            node = parent;
        }
    }
}

impl<T: TreeSource> BuildStrategy for DomPull<T> {
    fn produce_next(&mut self, target: &mut BuildTarget<'_>) -> Result<bool, DtmError> {
        let before = self.appender.mutations();
        loop {
            match self.position {
                Position::Done => return Ok(self.appender.mutations() != before),
                Position::Start => self.begin(target)?,
                Position::At(node) => self.visit(node, target)?,
            }
            if self.appender.mutations() != before {
                return Ok(true);
            }
        }
    }

    fn name(&self) -> &'static str {
        "dom-pull"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{SourceData, SourceTree};
    use crate::dtm::strings::StringPool;
    use crate::dtm::{ExpandedNameTable, Link, NodeStore};
    use crate::sax::QName;

    fn drain(tree: SourceTree, config: &DtmConfig) -> Result<NodeStore, DtmError> {
        let mut store = NodeStore::with_capacity(8);
        let mut names = ExpandedNameTable::new();
        let mut strings = StringPool::new();
        let mut target = BuildTarget {
            store: &mut store,
            names: &mut names,
            strings: &mut strings,
        };
        let mut strategy = DomPull::new(tree, config);
        while strategy.produce_next(&mut target)? {}
        Ok(store)
    }

    #[test]
    fn test_walks_in_document_order() {
        let mut tree = SourceTree::new();
        let root = tree.root_id();
        let a = tree.append_child(root, SourceData::element(QName::local("a")));
        let b = tree.append_child(a, SourceData::element(QName::local("b")));
        tree.append_child(b, SourceData::Text("x".into()));
        tree.append_child(a, SourceData::Comment("c".into()));

        let store = drain(tree, &DtmConfig::default()).unwrap();
        let kinds: Vec<_> = (0..store.len() as u32).map(|i| store.kind(i)).collect();
        assert_eq!(
            kinds,
            [NodeType::Document, NodeType::Element, NodeType::Element, NodeType::Text, NodeType::Comment]
        );
        assert_eq!(store.next_sibling(2), Link::Present(4));
        assert_eq!(store.next_sibling(4), Link::Absent);
        assert_eq!(store.parent(3), Some(2));
    }

    #[test]
    fn test_adjacent_source_text_coalesces() {
        let mut tree = SourceTree::new();
        let root = tree.root_id();
        let a = tree.append_child(root, SourceData::element(QName::local("a")));
        tree.append_child(a, SourceData::Text("one".into()));
        tree.append_child(a, SourceData::Text("two".into()));

        let store = drain(tree, &DtmConfig::default()).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_sibling_cycle_rejected() {
        let mut tree = SourceTree::new();
        let root = tree.root_id();
        let a = tree.append_child(root, SourceData::element(QName::local("a")));
        let b = tree.append_child(a, SourceData::element(QName::local("b")));
        let c = tree.append_child(a, SourceData::Comment("c".into()));
        tree.append_child(root, SourceData::element(QName::local("d")));
        // c points back at b; both name a as parent
        tree.set_next_sibling(c, Some(b));

        let err = drain(tree, &DtmConfig::default()).unwrap_err();
        assert!(matches!(err, DtmError::InconsistentSource(ref msg) if msg.contains("loops back")));
    }

    #[test]
    fn test_sibling_watch_finds_loops() {
        let mut watch = SiblingWatch::new(0u32);
        // 0 -> 1 -> 2 -> 3 -> 1 -> ...
        let chain = [1, 2, 3, 1, 2, 3, 1, 2, 3];
        let hit = chain.iter().position(|&n| watch.step(n));
        assert!(hit.is_some());

        let mut straight = SiblingWatch::new(0u32);
        assert!((1..1000).all(|n| !straight.step(n)));
    }

    #[test]
    fn test_depth_limit_stops_deep_source() {
        let mut tree = SourceTree::new();
        let mut parent = tree.root_id();
        for _ in 0..10 {
            parent = tree.append_child(parent, SourceData::element(QName::local("n")));
        }
        let err = drain(tree, &DtmConfig::new().max_depth(5)).unwrap_err();
        assert_eq!(err, DtmError::DepthLimit(5));
    }
}
