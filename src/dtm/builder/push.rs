//! Push-style builder
//!
//! A [`ContentHandler`] that builds a complete DTM from events pushed at it,
//! e.g. a subtree dispatched out of another DTM.

use tracing::debug;

use super::{Appender, BuildTarget};
use crate::config::DtmConfig;
use crate::dtm::strings::StringPool;
use crate::dtm::{Dtm, ExpandedNameTable, NodeStore, NodeType};
use crate::error::DtmError;
use crate::sax::{Attribute, ContentHandler, NamespaceDecl, QName};

pub struct DtmPushBuilder {
    store: NodeStore,
    names: ExpandedNameTable,
    strings: StringPool,
    appender: Appender,
    config: DtmConfig,
}

impl DtmPushBuilder {
    pub fn new(config: DtmConfig) -> Self {
        DtmPushBuilder {
            store: NodeStore::with_capacity(config.capacity()),
            names: ExpandedNameTable::new(),
            strings: StringPool::new(),
            appender: Appender::new(&config),
            config,
        }
    }

    fn with_target<R>(
        &mut self,
        f: impl FnOnce(&mut Appender, &mut BuildTarget<'_>) -> Result<R, DtmError>,
    ) -> Result<R, DtmError> {
        let mut target = BuildTarget {
            store: &mut self.store,
            names: &mut self.names,
            strings: &mut self.strings,
        };
        f(&mut self.appender, &mut target)
    }

    /// Close the document and hand back the finished DTM
    pub fn finish(mut self) -> Result<Dtm, DtmError> {
        self.with_target(|appender, target| appender.end_document(target))?;
        debug!(nodes = self.store.len(), "push build complete");
        Ok(Dtm::from_parts(self.store, self.names, self.strings, self.config))
    }
}

impl ContentHandler for DtmPushBuilder {
    fn start_document(&mut self) -> Result<(), DtmError> {
        self.with_target(|appender, target| appender.start_document(target))
    }

    fn end_document(&mut self) -> Result<(), DtmError> {
        self.with_target(|appender, target| appender.end_document(target))
    }

    fn start_element(
        &mut self,
        name: &QName,
        namespaces: &[NamespaceDecl],
        attributes: &[Attribute],
    ) -> Result<(), DtmError> {
        self.with_target(|appender, target| appender.start_element(target, name, namespaces, attributes))
    }

    fn end_element(&mut self, _name: &QName) -> Result<(), DtmError> {
        self.with_target(|appender, target| appender.end_element(target))
    }

    fn characters(&mut self, text: &str) -> Result<(), DtmError> {
        self.appender.characters(text)
    }

    fn cdata(&mut self, text: &str) -> Result<(), DtmError> {
        self.with_target(|appender, target| appender.leaf(target, NodeType::CData, "", "", text))
    }

    fn comment(&mut self, text: &str) -> Result<(), DtmError> {
        self.with_target(|appender, target| appender.leaf(target, NodeType::Comment, "", "", text))
    }

    fn processing_instruction(&mut self, pi: &str, data: &str) -> Result<(), DtmError> {
        self.with_target(|appender, target| {
            appender.leaf(target, NodeType::ProcessingInstruction, pi, pi, data)
        })
    }
}
