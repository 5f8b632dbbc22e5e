//! Event-pull strategy

use super::{Appender, BuildStrategy, BuildTarget};
use crate::config::DtmConfig;
use crate::error::DtmError;
use crate::sax::EventSource;

/// Builds from an [`EventSource`], one event at a time
pub struct SaxPull<S> {
    source: S,
    appender: Appender,
}

impl<S: EventSource> SaxPull<S> {
    pub fn new(source: S, config: &DtmConfig) -> Self {
        SaxPull {
            source,
            appender: Appender::new(config),
        }
    }
}

impl<S: EventSource> BuildStrategy for SaxPull<S> {
    fn produce_next(&mut self, target: &mut BuildTarget<'_>) -> Result<bool, DtmError> {
        let before = self.appender.mutations();
        loop {
            match self.source.next_event()? {
                Some(event) => self.appender.apply(target, &event)?,
                None => {
                    // Sources that stop without EndDocument are closed here
                    if !self.appender.is_finished() {
                        self.appender.end_document(target)?;
                    }
                    return Ok(self.appender.mutations() != before);
                }
            }
            if self.appender.mutations() != before {
                return Ok(true);
            }
        }
    }

    fn name(&self) -> &'static str {
        "sax-pull"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::XmlEventReader;
    use crate::dtm::strings::StringPool;
    use crate::dtm::{ExpandedNameTable, Link, NodeStore};

    #[test]
    fn test_one_change_per_call() {
        let mut store = NodeStore::with_capacity(8);
        let mut names = ExpandedNameTable::new();
        let mut strings = StringPool::new();
        let mut target = BuildTarget {
            store: &mut store,
            names: &mut names,
            strings: &mut strings,
        };
        let mut strategy = SaxPull::new(XmlEventReader::new("<a><b/></a>"), &DtmConfig::default());

        assert!(strategy.produce_next(&mut target).unwrap());
        assert_eq!(target.store.len(), 1);
        assert!(strategy.produce_next(&mut target).unwrap());
        assert_eq!(target.store.len(), 2);
        assert_eq!(target.store.first_child(1), Link::Unresolved);
        assert!(strategy.produce_next(&mut target).unwrap());
        assert_eq!(target.store.first_child(1), Link::Present(2));

        while strategy.produce_next(&mut target).unwrap() {}
        assert_eq!(target.store.len(), 3);
        assert_eq!(target.store.next_sibling(2), Link::Absent);
        assert!(!strategy.produce_next(&mut target).unwrap());
    }
}
