//! Construction Events
//!
//! Owned events produced by XML readers and consumed by DTM builders. The same
//! types describe a `TreeSource` node and the events a DTM dispatches back out.

use std::borrow::Cow;

use super::handler::ContentHandler;
use crate::error::DtmError;

/// A namespace-qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QName {
    /// Namespace URI, empty for no namespace
    pub namespace: String,
    /// Prefix as written, empty when unprefixed
    pub prefix: String,
    pub local: String,
}

impl QName {
    /// A name in no namespace
    pub fn local(local: impl Into<String>) -> Self {
        QName {
            namespace: String::new(),
            prefix: String::new(),
            local: local.into(),
        }
    }

    pub fn new(namespace: impl Into<String>, prefix: impl Into<String>, local: impl Into<String>) -> Self {
        QName {
            namespace: namespace.into(),
            prefix: prefix.into(),
            local: local.into(),
        }
    }

    /// `prefix:local`, or just `local`
    pub fn qualified(&self) -> Cow<'_, str> {
        if self.prefix.is_empty() {
            Cow::Borrowed(&self.local)
        } else {
            Cow::Owned(format!("{}:{}", self.prefix, self.local))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Attribute {
            name,
            value: value.into(),
        }
    }
}

/// An `xmlns` / `xmlns:prefix` declaration; the default namespace has an empty prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: String,
    pub uri: String,
}

impl NamespaceDecl {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        NamespaceDecl {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}

/// One step of a document in construction order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    StartDocument,
    EndDocument,
    StartElement {
        name: QName,
        namespaces: Vec<NamespaceDecl>,
        attributes: Vec<Attribute>,
    },
    EndElement {
        name: QName,
    },
    /// Character data, entities already decoded
    Characters(String),
    CData(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

impl SourceEvent {
    #[inline]
    pub fn is_start_element(&self) -> bool {
        matches!(self, SourceEvent::StartElement { .. })
    }

    #[inline]
    pub fn is_end_element(&self) -> bool {
        matches!(self, SourceEvent::EndElement { .. })
    }

    /// Replay this event into a push-style handler
    pub fn dispatch<H: ContentHandler + ?Sized>(&self, handler: &mut H) -> Result<(), DtmError> {
        match self {
            SourceEvent::StartDocument => handler.start_document(),
            SourceEvent::EndDocument => handler.end_document(),
            SourceEvent::StartElement {
                name,
                namespaces,
                attributes,
            } => handler.start_element(name, namespaces, attributes),
            SourceEvent::EndElement { name } => handler.end_element(name),
            SourceEvent::Characters(text) => handler.characters(text),
            SourceEvent::CData(text) => handler.cdata(text),
            SourceEvent::Comment(text) => handler.comment(text),
            SourceEvent::ProcessingInstruction { target, data } => {
                handler.processing_instruction(target, data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(QName::local("item").qualified(), "item");
        assert_eq!(QName::new("urn:x", "x", "item").qualified(), "x:item");
    }

    #[test]
    fn test_event_predicates() {
        let start = SourceEvent::StartElement {
            name: QName::local("a"),
            namespaces: Vec::new(),
            attributes: Vec::new(),
        };
        assert!(start.is_start_element());
        assert!(!start.is_end_element());
        assert!(SourceEvent::EndElement { name: QName::local("a") }.is_end_element());
    }
}
