//! Incremental DTM construction
//!
//! A build strategy pulls from its source until it has changed the store
//! (appended a node or resolved a lazy link) and then returns, so a DTM can
//! ask for exactly as much of the document as a query needs.
//!
//! - `SaxPull`: pulls `SourceEvent`s from an `EventSource`
//! - `DomPull`: walks a `TreeSource` depth-first
//! - `DtmPushBuilder`: receives events through `ContentHandler` and builds eagerly
//!
//! All three feed the same [`Appender`], which owns the open-element stack and
//! enforces the store invariants: an element is appended together with its
//! namespace and attribute nodes, adjacent character data coalesces into one
//! text node, and closing an element resolves the links that were waiting on it.

pub mod dom_pull;
pub mod push;
pub mod sax_pull;

pub use dom_pull::DomPull;
pub use push::DtmPushBuilder;
pub use sax_pull::SaxPull;

use super::expanded::ExpandedNameTable;
use super::store::{NodeRecord, NodeStore};
use super::strings::StringPool;
use super::{Link, NodeType};
use crate::config::DtmConfig;
use crate::core::scanner::is_whitespace;
use crate::error::DtmError;
use crate::sax::{Attribute, NamespaceDecl, QName, SourceEvent};

/// Mutable view of the parts of a DTM a builder writes to
pub struct BuildTarget<'a> {
    pub store: &'a mut NodeStore,
    pub names: &'a mut ExpandedNameTable,
    pub strings: &'a mut StringPool,
}

/// One way of discovering nodes
pub trait BuildStrategy {
    /// Advance until the store changes; `Ok(false)` once the source is exhausted
    fn produce_next(&mut self, target: &mut BuildTarget<'_>) -> Result<bool, DtmError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    id: u32,
    last_child: Option<u32>,
}

/// Shared append logic behind every strategy
#[derive(Debug)]
pub struct Appender {
    open: Vec<OpenNode>,
    pending_text: String,
    strip_whitespace: bool,
    max_depth: u16,
    mutations: u64,
    started: bool,
    finished: bool,
}

impl Appender {
    pub fn new(config: &DtmConfig) -> Self {
        Appender {
            open: Vec::with_capacity(32),
            pending_text: String::new(),
            strip_whitespace: config.strips_whitespace(),
            max_depth: config.depth_limit(),
            mutations: 0,
            started: false,
            finished: false,
        }
    }

    /// Count of appends and link resolutions so far
    #[inline]
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn apply(&mut self, target: &mut BuildTarget<'_>, event: &SourceEvent) -> Result<(), DtmError> {
        match event {
            SourceEvent::StartDocument => self.start_document(target),
            SourceEvent::EndDocument => self.end_document(target),
            SourceEvent::StartElement {
                name,
                namespaces,
                attributes,
            } => self.start_element(target, name, namespaces, attributes),
            SourceEvent::EndElement { .. } => self.end_element(target),
            SourceEvent::Characters(text) => self.characters(text),
            SourceEvent::CData(text) => self.leaf(target, NodeType::CData, "", "", text),
            SourceEvent::Comment(text) => self.leaf(target, NodeType::Comment, "", "", text),
            SourceEvent::ProcessingInstruction { target: pi, data } => {
                self.leaf(target, NodeType::ProcessingInstruction, pi, pi, data)
            }
        }
    }

    pub fn start_document(&mut self, target: &mut BuildTarget<'_>) -> Result<(), DtmError> {
        if self.started {
            return Err(DtmError::InconsistentSource("document started twice".into()));
        }
        let id = target.store.append(NodeRecord {
            kind: NodeType::Document,
            level: 0,
            parent: None,
            prev_sibling: None,
            expanded: NodeType::Document as u32,
            name: 0,
            value: 0,
        })?;
        self.open.push(OpenNode { id, last_child: None });
        self.started = true;
        self.mutations += 1;
        Ok(())
    }

    fn ensure_open(&mut self, target: &mut BuildTarget<'_>) -> Result<OpenNode, DtmError> {
        if !self.started {
            self.start_document(target)?;
        }
        if self.finished {
            return Err(DtmError::InconsistentSource("content after end of document".into()));
        }
        self.open
            .last()
            .copied()
            .ok_or_else(|| DtmError::InconsistentSource("no open node".into()))
    }

    fn append_child(&mut self, target: &mut BuildTarget<'_>, mut record: NodeRecord) -> Result<u32, DtmError> {
        let parent = self.ensure_open(target)?;
        record.parent = Some(parent.id);
        record.prev_sibling = parent.last_child;
        record.level = self.open.len() as u16;
        let id = target.store.append(record)?;
        if let Some(top) = self.open.last_mut() {
            top.last_child = Some(id);
        }
        self.mutations += 1;
        Ok(id)
    }

    pub fn start_element(
        &mut self,
        target: &mut BuildTarget<'_>,
        name: &QName,
        namespaces: &[NamespaceDecl],
        attributes: &[Attribute],
    ) -> Result<(), DtmError> {
        self.flush_text(target)?;
        let level = self.open.len().max(1) as u16;
        if level > self.max_depth {
            return Err(DtmError::DepthLimit(self.max_depth));
        }

        let record = NodeRecord {
            kind: NodeType::Element,
            level,
            parent: None,
            prev_sibling: None,
            expanded: target.names.expanded_type_id(&name.namespace, &name.local, NodeType::Element),
            name: target.strings.intern(&name.qualified()),
            value: 0,
        };
        let id = self.append_child(target, record)?;

        for decl in namespaces {
            target.store.append(NodeRecord {
                kind: NodeType::Namespace,
                level: level + 1,
                parent: Some(id),
                prev_sibling: None,
                expanded: target.names.expanded_type_id("", &decl.prefix, NodeType::Namespace),
                name: target.strings.intern(&decl.prefix),
                value: target.strings.intern(&decl.uri),
            })?;
        }
        for attribute in attributes {
            target.store.append(NodeRecord {
                kind: NodeType::Attribute,
                level: level + 1,
                parent: Some(id),
                prev_sibling: None,
                expanded: target.names.expanded_type_id(
                    &attribute.name.namespace,
                    &attribute.name.local,
                    NodeType::Attribute,
                ),
                name: target.strings.intern(&attribute.name.qualified()),
                value: target.strings.intern(&attribute.value),
            })?;
        }

        self.open.push(OpenNode { id, last_child: None });
        Ok(())
    }

    pub fn end_element(&mut self, target: &mut BuildTarget<'_>) -> Result<(), DtmError> {
        self.flush_text(target)?;
        if self.open.len() < 2 {
            return Err(DtmError::InconsistentSource("end of element with no element open".into()));
        }
        if let Some(node) = self.open.pop() {
            self.close(target, node);
        }
        Ok(())
    }

    pub fn end_document(&mut self, target: &mut BuildTarget<'_>) -> Result<(), DtmError> {
        if self.finished {
            return Ok(());
        }
        self.ensure_open(target)?;
        self.flush_text(target)?;
        if self.open.len() > 1 {
            return Err(DtmError::InconsistentSource("element left open at end of document".into()));
        }
        if let Some(document) = self.open.pop() {
            self.close(target, document);
        }
        self.finished = true;
        Ok(())
    }

    /// Buffer character data until something other than text arrives
    pub fn characters(&mut self, text: &str) -> Result<(), DtmError> {
        self.pending_text.push_str(text);
        Ok(())
    }

    pub fn leaf(
        &mut self,
        target: &mut BuildTarget<'_>,
        kind: NodeType,
        local: &str,
        qualified: &str,
        value: &str,
    ) -> Result<(), DtmError> {
        self.flush_text(target)?;
        let record = NodeRecord {
            kind,
            level: 0,
            parent: None,
            prev_sibling: None,
            expanded: target.names.expanded_type_id("", local, kind),
            name: target.strings.intern(qualified),
            value: target.strings.intern(value),
        };
        self.append_child(target, record)?;
        Ok(())
    }

    fn flush_text(&mut self, target: &mut BuildTarget<'_>) -> Result<(), DtmError> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending_text);
        if self.strip_whitespace && is_whitespace(&text) {
            return Ok(());
        }
        let record = NodeRecord {
            kind: NodeType::Text,
            level: 0,
            parent: None,
            prev_sibling: None,
            expanded: NodeType::Text as u32,
            name: 0,
            value: target.strings.intern(&text),
        };
        self.append_child(target, record)?;
        Ok(())
    }

    fn close(&mut self, target: &mut BuildTarget<'_>, node: OpenNode) {
        match node.last_child {
            Some(last) => target.store.resolve_next_sibling(last, Link::Absent),
            None => target.store.resolve_first_child(node.id, Link::Absent),
        }
        // The closed node's own next_sibling stays open until a sibling arrives
        // or its parent closes.
        self.mutations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Parts {
        store: NodeStore,
        names: ExpandedNameTable,
        strings: StringPool,
    }

    impl Parts {
        fn new() -> Self {
            Parts {
                store: NodeStore::with_capacity(16),
                names: ExpandedNameTable::new(),
                strings: StringPool::new(),
            }
        }

        fn target(&mut self) -> BuildTarget<'_> {
            BuildTarget {
                store: &mut self.store,
                names: &mut self.names,
                strings: &mut self.strings,
            }
        }
    }

    #[test]
    fn test_element_group_is_contiguous() {
        let mut parts = Parts::new();
        let mut appender = Appender::new(&DtmConfig::default());
        let mut target = parts.target();
        appender.start_document(&mut target).unwrap();
        appender
            .start_element(
                &mut target,
                &QName::local("a"),
                &[NamespaceDecl::new("p", "urn:p")],
                &[Attribute::new(QName::local("x"), "1"), Attribute::new(QName::local("y"), "2")],
            )
            .unwrap();
        appender.characters("hi").unwrap();
        appender.end_element(&mut target).unwrap();
        appender.end_document(&mut target).unwrap();

        let kinds: Vec<_> = (0..parts.store.len() as u32).map(|i| parts.store.kind(i)).collect();
        assert_eq!(
            kinds,
            [
                NodeType::Document,
                NodeType::Element,
                NodeType::Namespace,
                NodeType::Attribute,
                NodeType::Attribute,
                NodeType::Text
            ]
        );
        assert_eq!(parts.store.first_child(1), Link::Present(5));
        assert_eq!(parts.store.next_sibling(5), Link::Absent);
        assert_eq!(parts.store.next_sibling(1), Link::Absent);
        assert_eq!(parts.store.level(3), 2);
        assert_eq!(parts.strings.get(parts.store.value(5)), "hi");
    }

    #[test]
    fn test_text_coalesces_and_strips() {
        let mut parts = Parts::new();
        let config = DtmConfig::new().strip_whitespace(true);
        let mut appender = Appender::new(&config);
        let mut target = parts.target();
        appender.start_element(&mut target, &QName::local("a"), &[], &[]).unwrap();
        appender.characters("  ").unwrap();
        appender.leaf(&mut target, NodeType::Comment, "", "", "c").unwrap();
        appender.characters("one").unwrap();
        appender.characters(" two").unwrap();
        appender.end_element(&mut target).unwrap();
        appender.end_document(&mut target).unwrap();

        assert_eq!(parts.store.len(), 4);
        assert_eq!(parts.store.kind(2), NodeType::Comment);
        assert_eq!(parts.store.kind(3), NodeType::Text);
        assert_eq!(parts.strings.get(parts.store.value(3)), "one two");
    }

    #[test]
    fn test_depth_limit() {
        let mut parts = Parts::new();
        let mut appender = Appender::new(&DtmConfig::new().max_depth(2));
        let mut target = parts.target();
        appender.start_document(&mut target).unwrap();
        let name = QName::local("n");
        appender.start_element(&mut target, &name, &[], &[]).unwrap();
        appender.start_element(&mut target, &name, &[], &[]).unwrap();
        let err = appender.start_element(&mut target, &name, &[], &[]).unwrap_err();
        assert_eq!(err, DtmError::DepthLimit(2));
    }

    #[test]
    fn test_unbalanced_events_rejected() {
        let mut parts = Parts::new();
        let mut appender = Appender::new(&DtmConfig::default());
        let mut target = parts.target();
        appender.start_document(&mut target).unwrap();
        assert!(matches!(
            appender.end_element(&mut target),
            Err(DtmError::InconsistentSource(_))
        ));
        appender.start_element(&mut target, &QName::local("a"), &[], &[]).unwrap();
        assert!(matches!(
            appender.end_document(&mut target),
            Err(DtmError::InconsistentSource(_))
        ));
    }
}
