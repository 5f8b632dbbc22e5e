//! Parallel evaluation over independent documents
//!
//! Uses Rayon. Each task owns exactly one `Dtm` for its whole run, so lazy
//! building inside a document never crosses threads.

use rayon::prelude::*;
use tracing::debug;

use crate::config::DtmConfig;
use crate::dtm::{Dtm, NodeHandle};
use crate::error::{DtmError, PathError};
use crate::xpath::LocationPath;

/// Parse several sources at once, each into a fully built DTM
pub fn parse_parallel(sources: &[&str], config: &DtmConfig) -> Vec<Result<Dtm, DtmError>> {
    debug!(documents = sources.len(), "parallel parse");
    let config = config.clone().eager(true);
    sources
        .par_iter()
        .map(|xml| Dtm::parse(*xml, config.clone()))
        .collect()
}

/// Evaluate `path` from the document node of every DTM
pub fn evaluate_parallel(dtms: &mut [Dtm], path: &LocationPath) -> Vec<Result<Vec<NodeHandle>, PathError>> {
    debug!(documents = dtms.len(), steps = path.len(), "parallel evaluation");
    dtms.par_iter_mut()
        .map(|dtm| {
            let root = dtm.document_node();
            path.select(dtm, root)
        })
        .collect()
}

/// Evaluate `path` over every DTM and map each selected node
///
/// The first error from any document is returned.
pub fn select_map<F, T>(dtms: &mut [Dtm], path: &LocationPath, mapper: F) -> Result<Vec<Vec<T>>, PathError>
where
    F: Fn(&mut Dtm, NodeHandle) -> T + Sync + Send,
    T: Send,
{
    dtms.par_iter_mut()
        .map(|dtm| {
            let root = dtm.document_node();
            let nodes = path.select(dtm, root)?;
            Ok(nodes.into_iter().map(|node| mapper(dtm, node)).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtm::Navigator;
    use crate::xpath::{Axis, NodeTest};

    fn items() -> LocationPath {
        LocationPath::builder()
            .step(Axis::Descendant, NodeTest::name("item"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_parallel_eval() {
        let sources = ["<r><item/></r>", "<r><item/><item/></r>", "<r/>"];
        let mut dtms: Vec<Dtm> = parse_parallel(&sources, &DtmConfig::default())
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(dtms.iter().all(Dtm::is_fully_built));

        let results = evaluate_parallel(&mut dtms, &items());
        let counts: Vec<_> = results.into_iter().map(|r| r.unwrap().len()).collect();
        assert_eq!(counts, [1, 2, 0]);
    }

    #[test]
    fn test_select_map() {
        let mut dtms = vec![
            Dtm::parse("<r><item>a</item></r>", DtmConfig::default()).unwrap(),
            Dtm::parse("<r><item>b</item><item>c</item></r>", DtmConfig::default()).unwrap(),
        ];
        let values = select_map(&mut dtms, &items(), |dtm, node| dtm.string_value(node).unwrap_or_default()).unwrap();
        assert_eq!(values, [vec!["a".to_string()], vec!["b".to_string(), "c".to_string()]]);
    }

    #[test]
    fn test_parse_errors_stay_per_document() {
        let config = DtmConfig::new().strict(true);
        let results = parse_parallel(&["<ok/>", "<broken>"], &config);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DtmError::Malformed { .. })));
    }
}
