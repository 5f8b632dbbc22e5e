//! SAX-style event model
//!
//! ```text
//! XmlEventReader --(EventSource)--> SaxPull builder --> Dtm
//! Dtm::dispatch_to_events --(ContentHandler)--> EventRecorder / DtmPushBuilder
//! ```

pub mod collector;
pub mod events;
pub mod handler;

pub use collector::EventRecorder;
pub use events::{Attribute, NamespaceDecl, QName, SourceEvent};
pub use handler::{ContentHandler, EventReplay, EventSource};
