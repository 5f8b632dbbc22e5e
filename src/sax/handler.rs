//! Push and pull event interfaces
//!
//! `ContentHandler` receives events pushed at it (a DTM re-emitting a subtree,
//! or a push-style builder). `EventSource` is the pull side: the lazy SAX
//! builder asks it for one event at a time.

use super::events::{Attribute, NamespaceDecl, QName, SourceEvent};
use crate::error::DtmError;

/// Receiver of construction-style events
///
/// Only element boundaries and character data are mandatory; the other
/// callbacks default to ignoring the event.
pub trait ContentHandler {
    fn start_document(&mut self) -> Result<(), DtmError> {
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), DtmError> {
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &QName,
        namespaces: &[NamespaceDecl],
        attributes: &[Attribute],
    ) -> Result<(), DtmError>;

    fn end_element(&mut self, name: &QName) -> Result<(), DtmError>;

    fn characters(&mut self, text: &str) -> Result<(), DtmError>;

    /// CDATA content; handlers that do not care about the distinction get characters
    fn cdata(&mut self, text: &str) -> Result<(), DtmError> {
        self.characters(text)
    }

    fn comment(&mut self, _text: &str) -> Result<(), DtmError> {
        Ok(())
    }

    fn processing_instruction(&mut self, _target: &str, _data: &str) -> Result<(), DtmError> {
        Ok(())
    }
}

/// Pull-style producer of events in document order
///
/// A well-formed stream starts with `StartDocument`, ends with `EndDocument`,
/// and balances element starts and ends. `Ok(None)` means exhausted.
pub trait EventSource {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, DtmError>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, DtmError> {
        (**self).next_event()
    }
}

/// Replays an owned list of events
#[derive(Debug, Clone)]
pub struct EventReplay {
    events: std::vec::IntoIter<SourceEvent>,
}

impl EventReplay {
    pub fn new(events: Vec<SourceEvent>) -> Self {
        EventReplay {
            events: events.into_iter(),
        }
    }
}

impl EventSource for EventReplay {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, DtmError> {
        Ok(self.events.next())
    }
}
