//! The DTM document
//!
//! A [`Dtm`] owns its node columns, name tables and (until the source is
//! exhausted) the strategy that discovers more nodes. Navigation that hits an
//! unresolved field pulls from the strategy until the field is known, so only
//! the part of the document a query touches is ever built.

use tracing::debug;

use super::builder::{BuildStrategy, BuildTarget, DomPull, SaxPull};
use super::dispatch;
use super::expanded::ExpandedNameTable;
use super::navigator::Navigator;
use super::store::NodeStore;
use super::strings::StringPool;
use super::{Link, NodeHandle, NodeType};
use crate::config::DtmConfig;
use crate::core::XmlEventReader;
use crate::dom::TreeSource;
use crate::error::DtmError;
use crate::sax::{ContentHandler, EventSource};
use crate::xpath::axes::{Axis, AxisIterator, NodeFilter};

pub struct Dtm {
    id: u16,
    store: NodeStore,
    names: ExpandedNameTable,
    strings: StringPool,
    builder: Option<Box<dyn BuildStrategy + Send>>,
    failure: Option<DtmError>,
    config: DtmConfig,
}

impl std::fmt::Debug for Dtm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dtm")
            .field("id", &self.id)
            .field("nodes", &self.store.len())
            .field("building", &self.builder.is_some())
            .finish()
    }
}

impl Dtm {
    /// DTM over XML text, read through [`XmlEventReader`]
    pub fn parse(xml: impl Into<String>, config: DtmConfig) -> Result<Self, DtmError> {
        let reader = XmlEventReader::new(xml).strict(config.is_strict());
        Self::from_events(reader, config)
    }

    /// DTM pulling from any event source
    pub fn from_events<S>(source: S, config: DtmConfig) -> Result<Self, DtmError>
    where
        S: EventSource + Send + 'static,
    {
        let strategy = SaxPull::new(source, &config);
        Self::with_strategy(Box::new(strategy), config)
    }

    /// DTM walking an external tree
    pub fn from_tree<T>(tree: T, config: DtmConfig) -> Result<Self, DtmError>
    where
        T: TreeSource + Send + 'static,
    {
        let strategy = DomPull::new(tree, &config);
        Self::with_strategy(Box::new(strategy), config)
    }

    fn with_strategy(builder: Box<dyn BuildStrategy + Send>, config: DtmConfig) -> Result<Self, DtmError> {
        debug!(strategy = builder.name(), eager = config.is_eager(), "dtm build start");
        let mut dtm = Dtm {
            id: 0,
            store: NodeStore::with_capacity(config.capacity()),
            names: ExpandedNameTable::new(),
            strings: StringPool::new(),
            builder: Some(builder),
            failure: None,
            config,
        };
        // The document node always exists once construction returns
        dtm.produce_next()?;
        if dtm.store.is_empty() {
            return Err(DtmError::InconsistentSource("source produced no document node".into()));
        }
        if dtm.config.is_eager() {
            dtm.build_all()?;
        }
        Ok(dtm)
    }

    /// DTM over columns that are already complete
    pub(crate) fn from_parts(
        store: NodeStore,
        names: ExpandedNameTable,
        strings: StringPool,
        config: DtmConfig,
    ) -> Self {
        Dtm {
            id: 0,
            store,
            names,
            strings,
            builder: None,
            failure: None,
            config,
        }
    }

    /// Pull one more step from the source; `Ok(false)` once it is exhausted
    ///
    /// An error is fatal: it is returned again on every later call.
    pub fn produce_next(&mut self) -> Result<bool, DtmError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let Some(builder) = self.builder.as_mut() else {
            return Ok(false);
        };
        let mut target = BuildTarget {
            store: &mut self.store,
            names: &mut self.names,
            strings: &mut self.strings,
        };
        match builder.produce_next(&mut target) {
            Ok(true) => Ok(true),
            Ok(false) => {
                debug!(dtm = self.id, nodes = self.store.len(), strategy = builder.name(), "dtm build complete");
                self.builder = None;
                Ok(false)
            }
            Err(err) => {
                debug!(dtm = self.id, nodes = self.store.len(), error = %err, "dtm build failed");
                self.builder = None;
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Drain the source completely
    pub fn build_all(&mut self) -> Result<(), DtmError> {
        while self.produce_next()? {}
        Ok(())
    }

    fn pull_until(&mut self, done: impl Fn(&NodeStore) -> bool) -> Result<(), DtmError> {
        while !done(&self.store) {
            if !self.produce_next()? {
                break;
            }
        }
        Ok(())
    }

    pub fn is_fully_built(&self) -> bool {
        self.builder.is_none() && self.failure.is_none()
    }

    /// Nodes discovered so far
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: u16) {
        self.id = id;
    }

    pub fn config(&self) -> &DtmConfig {
        &self.config
    }

    #[inline]
    pub fn handle(&self, identity: u32) -> NodeHandle {
        NodeHandle::new(self.id, identity)
    }

    #[inline]
    pub fn document_node(&self) -> NodeHandle {
        self.handle(0)
    }

    #[inline]
    fn local(&self, node: NodeHandle) -> u32 {
        debug_assert_eq!(node.dtm_id(), self.id, "{node:?} is foreign to dtm {}", self.id);
        node.identity()
    }

    fn checked(&self, node: NodeHandle) -> Result<u32, DtmError> {
        if node.dtm_id() != self.id {
            return Err(DtmError::ForeignHandle(node.raw()));
        }
        Ok(node.identity())
    }

    /// Intern an expanded name in this DTM's table
    pub fn expanded_type_id(&mut self, namespace: &str, local: &str, kind: NodeType) -> u32 {
        self.names.expanded_type_id(namespace, local, kind)
    }

    pub fn expanded_names(&self) -> &ExpandedNameTable {
        &self.names
    }

    /// Fresh, restartable iterator for `axis`; call `set_start_node` before use
    pub fn axis_iterator(&self, axis: Axis, filter: NodeFilter) -> AxisIterator {
        AxisIterator::new(axis, filter)
    }

    /// Push the string-value of `node` as one characters event
    pub fn dispatch_characters_events<H: ContentHandler + ?Sized>(
        &mut self,
        node: NodeHandle,
        handler: &mut H,
    ) -> Result<(), DtmError> {
        dispatch::dispatch_characters_events(self, node, handler)
    }

    /// Re-emit the subtree rooted at `node` as construction events
    pub fn dispatch_to_events<H: ContentHandler + ?Sized>(
        &mut self,
        node: NodeHandle,
        handler: &mut H,
    ) -> Result<(), DtmError> {
        dispatch::dispatch_to_events(self, node, handler)
    }

    /// A DTM is read-only once built
    pub fn append_child(&mut self, _parent: NodeHandle, _child: NodeHandle) -> Result<(), DtmError> {
        Err(DtmError::Unsupported("append_child"))
    }

    pub fn append_text_child(&mut self, _parent: NodeHandle, _text: &str) -> Result<(), DtmError> {
        Err(DtmError::Unsupported("append_text_child"))
    }
}

impl Navigator for Dtm {
    fn first_child(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
        let id = self.checked(node)?;
        self.pull_until(|store| store.first_child(id).is_resolved())?;
        Ok(match self.store.first_child(id) {
            Link::Present(child) => Some(self.handle(child)),
            _ => None,
        })
    }

    fn next_sibling(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
        let id = self.checked(node)?;
        self.pull_until(|store| store.next_sibling(id).is_resolved())?;
        Ok(match self.store.next_sibling(id) {
            Link::Present(sibling) => Some(self.handle(sibling)),
            _ => None,
        })
    }

    fn node_after(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
        let next = self.checked(node)? as usize + 1;
        self.pull_until(|store| store.len() > next)?;
        Ok((next < self.store.len()).then(|| self.handle(next as u32)))
    }

    fn string_value(&mut self, node: NodeHandle) -> Result<String, DtmError> {
        let id = self.checked(node)?;
        if !matches!(self.store.kind(id), NodeType::Document | NodeType::Element) {
            return Ok(self.strings.get(self.store.value(id)).to_string());
        }
        let level = self.store.level(id);
        let mut value = String::new();
        let mut cursor = self.node_after(node)?;
        while let Some(next) = cursor {
            let next_id = next.identity();
            if self.store.level(next_id) <= level {
                break;
            }
            if self.store.kind(next_id).is_text() {
                value.push_str(self.strings.get(self.store.value(next_id)));
            }
            cursor = self.node_after(next)?;
        }
        Ok(value)
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.store.parent(self.local(node)).map(|p| self.handle(p))
    }

    fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.store.prev_sibling(self.local(node)).map(|p| self.handle(p))
    }

    fn node_before(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.local(node).checked_sub(1).map(|id| self.handle(id))
    }

    fn node_type(&self, node: NodeHandle) -> NodeType {
        self.store.kind(self.local(node))
    }

    fn level(&self, node: NodeHandle) -> u16 {
        self.store.level(self.local(node))
    }

    fn expanded_type(&self, node: NodeHandle) -> u32 {
        self.store.expanded(self.local(node))
    }

    fn local_name(&self, node: NodeHandle) -> &str {
        self.names.local_name(self.store.expanded(self.local(node)))
    }

    fn namespace_uri(&self, node: NodeHandle) -> &str {
        self.names.namespace(self.store.expanded(self.local(node)))
    }

    fn node_name(&self, node: NodeHandle) -> &str {
        let id = self.local(node);
        match self.store.kind(id) {
            NodeType::Document => "#document",
            NodeType::Text => "#text",
            NodeType::CData => "#cdata-section",
            NodeType::Comment => "#comment",
            NodeType::Element | NodeType::Attribute | NodeType::ProcessingInstruction | NodeType::Namespace => {
                self.strings.get(self.store.name(id))
            }
        }
    }

    fn node_value(&self, node: NodeHandle) -> &str {
        self.strings.get(self.store.value(self.local(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{SourceData, SourceTree};
    use crate::sax::{EventRecorder, QName};

    fn children(dtm: &mut Dtm, node: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut child = dtm.first_child(node).unwrap();
        while let Some(c) = child {
            out.push(c);
            child = dtm.next_sibling(c).unwrap();
        }
        out
    }

    #[test]
    fn test_lazy_navigation_builds_on_demand() {
        let mut dtm = Dtm::parse("<a><b/><c><d/></c></a>", DtmConfig::default()).unwrap();
        assert_eq!(dtm.node_count(), 1);
        let root = dtm.document_node();
        let a = dtm.first_child(root).unwrap().unwrap();
        assert_eq!(dtm.node_count(), 2);
        assert_eq!(dtm.node_name(a), "a");
        assert!(!dtm.is_fully_built());

        let kids = children(&mut dtm, a);
        let names: Vec<_> = kids.iter().map(|&k| dtm.node_name(k).to_string()).collect();
        assert_eq!(names, ["b", "c"]);
        assert_eq!(dtm.parent(kids[1]), Some(a));
        assert_eq!(dtm.previous_sibling(kids[1]), Some(kids[0]));
        assert_eq!(dtm.level(kids[0]), 2);
    }

    #[test]
    fn test_eager_build() {
        let dtm = Dtm::parse("<a><b/></a>", DtmConfig::new().eager(true)).unwrap();
        assert!(dtm.is_fully_built());
        assert_eq!(dtm.node_count(), 3);
    }

    #[test]
    fn test_names_and_values() {
        let xml = r#"<p:a xmlns:p="urn:p" k="v"><?go now?><!--c--><![CDATA[x]]>t</p:a>"#;
        let mut dtm = Dtm::parse(xml, DtmConfig::new().eager(true)).unwrap();
        let a = dtm.first_child(dtm.document_node()).unwrap().unwrap();
        assert_eq!(dtm.node_name(a), "p:a");
        assert_eq!(dtm.local_name(a), "a");
        assert_eq!(dtm.namespace_uri(a), "urn:p");

        let ns = dtm.handle(a.identity() + 1);
        assert_eq!(dtm.node_type(ns), NodeType::Namespace);
        assert_eq!(dtm.node_name(ns), "p");
        assert_eq!(dtm.node_value(ns), "urn:p");

        let attr = dtm.handle(a.identity() + 2);
        assert_eq!(dtm.node_type(attr), NodeType::Attribute);
        assert_eq!(dtm.string_value(attr).unwrap(), "v");
        assert_eq!(dtm.parent(attr), Some(a));
        assert_eq!(dtm.next_sibling(attr).unwrap(), None);

        let kids = children(&mut dtm, a);
        let names: Vec<_> = kids.iter().map(|&k| dtm.node_name(k)).collect();
        assert_eq!(names, ["go", "#comment", "#cdata-section", "#text"]);
        assert_eq!(dtm.local_name(kids[0]), "go");
        assert_eq!(dtm.node_value(kids[0]), "now");
        assert_eq!(dtm.string_value(a).unwrap(), "xt");
        assert_eq!(dtm.node_name(dtm.document_node()), "#document");
    }

    #[test]
    fn test_strict_error_is_sticky() {
        let mut dtm = Dtm::parse("<a><b></a>", DtmConfig::new().strict(true)).unwrap();
        let root = dtm.document_node();
        let err = dtm.build_all().unwrap_err();
        assert!(matches!(err, DtmError::Malformed { .. }));
        // links resolved before the failure stay readable
        let a = dtm.first_child(root).unwrap().unwrap();
        // a was still open, so its sibling link needs a pull that can only fail
        assert_eq!(dtm.next_sibling(a).unwrap_err(), err);
        assert!(!dtm.is_fully_built());
    }

    #[test]
    fn test_strict_eager_fails_at_construction() {
        let err = Dtm::parse("<a>", DtmConfig::new().strict(true).eager(true)).unwrap_err();
        assert!(matches!(err, DtmError::Malformed { .. }));
    }

    #[test]
    fn test_inconsistent_tree_rejected() {
        let mut tree = SourceTree::new();
        let root = tree.root_id();
        let a = tree.append_child(root, SourceData::element(QName::local("a")));
        let b = tree.append_child(root, SourceData::element(QName::local("b")));
        // a claims b as its child while b names the document as parent
        tree.set_first_child(a, Some(b));
        let mut dtm = Dtm::from_tree(tree, DtmConfig::default()).unwrap();
        assert!(matches!(dtm.build_all(), Err(DtmError::InconsistentSource(_))));
    }

    #[test]
    fn test_tree_built_dtm_moves_across_threads() {
        let xml = "<a k='1'>x<b/><!--c--></a>";
        let tree = SourceTree::parse(xml, true).unwrap();
        let dtm = Dtm::from_tree(tree, DtmConfig::default()).unwrap();
        let mut dtm = std::thread::spawn(move || dtm).join().unwrap();
        let mut text = Dtm::parse(xml, DtmConfig::default()).unwrap();
        dtm.build_all().unwrap();
        text.build_all().unwrap();
        assert_eq!(dtm.node_count(), text.node_count());
        let a = dtm.first_child(dtm.document_node()).unwrap().unwrap();
        assert_eq!(children(&mut dtm, a).len(), 3);
    }

    #[test]
    fn test_foreign_handle_and_unsupported() {
        let mut dtm = Dtm::parse("<a/>", DtmConfig::default()).unwrap();
        let foreign = NodeHandle::new(7, 0);
        assert_eq!(dtm.first_child(foreign), Err(DtmError::ForeignHandle(foreign.raw())));
        let root = dtm.document_node();
        assert_eq!(dtm.append_child(root, root), Err(DtmError::Unsupported("append_child")));
        assert!(dtm.append_text_child(root, "x").is_err());
    }

    #[test]
    fn test_node_after_and_before() {
        let mut dtm = Dtm::parse("<a><b/></a>", DtmConfig::default()).unwrap();
        let root = dtm.document_node();
        let a = dtm.node_after(root).unwrap().unwrap();
        let b = dtm.node_after(a).unwrap().unwrap();
        assert_eq!(dtm.node_after(b).unwrap(), None);
        assert_eq!(dtm.node_before(b), Some(a));
        assert_eq!(dtm.node_before(root), None);
        assert!(dtm.is_node_after(a, b));
        assert!(!dtm.is_node_after(b, a));
        assert!(!dtm.is_node_after(a, a));
    }

    #[test]
    fn test_dispatch_round_trip() {
        let mut source = Dtm::parse("<a k='1'>x<b>y</b></a>", DtmConfig::default()).unwrap();
        let a = source.first_child(source.document_node()).unwrap().unwrap();
        let mut recorder = EventRecorder::new();
        source.dispatch_to_events(a, &mut recorder).unwrap();
        assert_eq!(recorder.text(), "xy");

        let mut copy = Dtm::from_events(recorder.into_replay(), DtmConfig::default()).unwrap();
        copy.build_all().unwrap();
        assert_eq!(copy.node_count(), source.node_count());
        let copied = copy.first_child(copy.document_node()).unwrap().unwrap();
        assert_eq!(copy.string_value(copied).unwrap(), "xy");
    }
}
