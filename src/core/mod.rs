//! XML text front end
//!
//! - `scanner`: memchr-backed byte cursor
//! - `entities`: predefined and numeric entity decoding
//! - `namespace`: prefix resolution stack
//! - `reader`: pull parser producing `SourceEvent`s

pub mod entities;
pub mod namespace;
pub mod reader;
pub mod scanner;

pub use reader::XmlEventReader;
