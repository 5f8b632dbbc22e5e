//! Event Recorder
//!
//! `ContentHandler` that keeps every event it is given, so a dispatched
//! subtree can be inspected or replayed into a new DTM.

use super::events::{Attribute, NamespaceDecl, QName, SourceEvent};
use super::handler::{ContentHandler, EventReplay};
use crate::error::DtmError;

/// Collector that gathers events as they are pushed
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Vec<SourceEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(64),
        }
    }

    pub fn events(&self) -> &[SourceEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SourceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Turn the recording into a pull source
    pub fn into_replay(self) -> EventReplay {
        EventReplay::new(self.events)
    }

    /// Concatenated character and CDATA content, in order
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                SourceEvent::Characters(text) | SourceEvent::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl ContentHandler for EventRecorder {
    fn start_document(&mut self) -> Result<(), DtmError> {
        self.events.push(SourceEvent::StartDocument);
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), DtmError> {
        self.events.push(SourceEvent::EndDocument);
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &QName,
        namespaces: &[NamespaceDecl],
        attributes: &[Attribute],
    ) -> Result<(), DtmError> {
        self.events.push(SourceEvent::StartElement {
            name: name.clone(),
            namespaces: namespaces.to_vec(),
            attributes: attributes.to_vec(),
        });
        Ok(())
    }

    fn end_element(&mut self, name: &QName) -> Result<(), DtmError> {
        self.events.push(SourceEvent::EndElement { name: name.clone() });
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), DtmError> {
        // Adjacent character runs arrive split around entity boundaries
        if let Some(SourceEvent::Characters(prev)) = self.events.last_mut() {
            prev.push_str(text);
        } else {
            self.events.push(SourceEvent::Characters(text.to_string()));
        }
        Ok(())
    }

    fn cdata(&mut self, text: &str) -> Result<(), DtmError> {
        self.events.push(SourceEvent::CData(text.to_string()));
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<(), DtmError> {
        self.events.push(SourceEvent::Comment(text.to_string()));
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), DtmError> {
        self.events.push(SourceEvent::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        });
        Ok(())
    }
}
