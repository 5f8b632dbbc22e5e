use rstest::rstest;
use rustydtm::xpath::{Axis, AxisIterator, LocationPath, NodeFilter, NodeTest, Predicate};
use rustydtm::{Dtm, DtmConfig, Navigator, NodeHandle};

const AXES: [Axis; 14] = [
    Axis::Ancestor,
    Axis::AncestorOrSelf,
    Axis::Attribute,
    Axis::Child,
    Axis::Descendant,
    Axis::DescendantOrSelf,
    Axis::Following,
    Axis::FollowingSibling,
    Axis::Namespace,
    Axis::Parent,
    Axis::Preceding,
    Axis::PrecedingSibling,
    Axis::Self_,
    Axis::Root,
];

fn eager(xml: &str) -> Dtm {
    Dtm::parse(xml, DtmConfig::new().eager(true)).unwrap()
}

fn lazy(xml: &str) -> Dtm {
    Dtm::parse(xml, DtmConfig::default()).unwrap()
}

fn all_nodes(dtm: &mut Dtm) -> Vec<NodeHandle> {
    let mut nodes = vec![dtm.document_node()];
    while let Some(next) = dtm.node_after(*nodes.last().unwrap()).unwrap() {
        nodes.push(next);
    }
    nodes
}

fn path(steps: &[(Axis, Option<usize>)]) -> LocationPath {
    let mut builder = LocationPath::builder();
    for &(axis, position) in steps {
        builder = builder.step(axis, NodeTest::AnyNode);
        if let Some(n) = position {
            builder = builder.predicate(Predicate::Position(n));
        }
    }
    builder.build().unwrap()
}

/// Each step applied context by context in axis order, then union, sort and dedup
fn step_by_step(dtm: &mut Dtm, steps: &[(Axis, Option<usize>)], context: NodeHandle) -> Vec<NodeHandle> {
    let mut current = vec![context];
    for &(axis, position) in steps {
        let mut next = Vec::new();
        for &node in &current {
            let mut iter = AxisIterator::new(axis, NodeFilter::Any);
            iter.set_start_node(node);
            let found = iter.remaining(dtm).unwrap();
            match position {
                Some(n) => next.extend(found.get(n - 1).copied()),
                None => next.extend(found),
            }
        }
        next.sort();
        next.dedup();
        current = next;
    }
    current
}

#[rstest]
#[case::mixed(r#"<r xmlns:p="urn:p"><a k="1">x<b/><!--c--></a><?pi d?><c><d m="2"/>y</c></r>"#)]
#[case::nested("<a><b><c/></b><d/></a>")]
#[case::same_names("<r><n><n><n/></n></n><n/></r>")]
#[case::single("<r/>")]
fn test_two_steps_match_step_by_step(#[case] xml: &str) {
    let mut reference = eager(xml);
    let contexts = all_nodes(&mut reference);
    for first in AXES {
        for second in AXES {
            for position in [None, Some(1), Some(2)] {
                let steps = [(first, None), (second, position)];
                let path = path(&steps);

                // from the document node while the tree is still being built
                let mut dtm = lazy(xml);
                let root = dtm.document_node();
                let selected = path.select(&mut dtm, root).unwrap();
                assert_eq!(
                    selected,
                    step_by_step(&mut reference, &steps, root),
                    "{}/{} [{position:?}] lazily from the root of {xml}",
                    first.name(),
                    second.name()
                );

                dtm.build_all().unwrap();
                for &context in &contexts {
                    assert_eq!(
                        path.select(&mut dtm, context).unwrap(),
                        step_by_step(&mut reference, &steps, context),
                        "{}/{} [{position:?}] from {context:?} in {xml}",
                        first.name(),
                        second.name()
                    );
                }
            }
        }
    }
}

#[rstest]
#[case::mixed(r#"<r xmlns:p="urn:p"><a k="1">x<b/><!--c--></a><?pi d?><c><d m="2"/>y</c></r>"#)]
#[case::nested("<a><b><c/></b><d/></a>")]
fn test_three_steps_match_step_by_step(#[case] xml: &str) {
    let mut reference = eager(xml);
    let root = reference.document_node();
    let element = reference.first_child(root).unwrap().unwrap();
    for first in AXES {
        for second in AXES {
            for third in AXES {
                let steps = [(first, None), (second, None), (third, None)];
                let path = path(&steps);
                let mut dtm = lazy(xml);
                for context in [root, element] {
                    if context == element {
                        // make sure the element exists in the lazy store
                        assert_eq!(dtm.first_child(root).unwrap(), Some(element));
                    }
                    assert_eq!(
                        path.select(&mut dtm, context).unwrap(),
                        step_by_step(&mut reference, &steps, context),
                        "{}/{}/{} from {context:?}",
                        first.name(),
                        second.name(),
                        third.name()
                    );
                }
            }
        }
    }
}
