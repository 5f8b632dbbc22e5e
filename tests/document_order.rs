use rstest::rstest;
use rustydtm::dom::{SourceData, SourceTree};
use rustydtm::sax::QName;
use rustydtm::xpath::{Axis, AxisIterator, NodeFilter};
use rustydtm::{Dtm, DtmConfig, DtmError, DtmManager, Navigator, NodeHandle, NodeType};

const SAMPLE: &str = r#"<r xmlns:p="urn:p"><a k="1" p:m="2">x<b>y</b><!--c--></a><?pi d?><c><d/><e>z</e></c></r>"#;

fn eager(xml: &str) -> Dtm {
    Dtm::parse(xml, DtmConfig::new().eager(true)).unwrap()
}

fn all_nodes(dtm: &mut Dtm) -> Vec<NodeHandle> {
    let mut nodes = vec![dtm.document_node()];
    while let Some(next) = dtm.node_after(*nodes.last().unwrap()).unwrap() {
        nodes.push(next);
    }
    nodes
}

/// `<r>` with `width` children, each holding an attribute, a text node and an empty element
fn wide_document(width: usize) -> String {
    let mut xml = String::from("<r>");
    for i in 0..width {
        xml.push_str(&format!(r#"<n i="{i}">t{i}<m/></n>"#));
    }
    xml.push_str("</r>");
    xml
}

#[test]
fn test_document_order_is_total_and_transitive() {
    let mut dtm = eager(SAMPLE);
    let nodes = all_nodes(&mut dtm);
    for (i, &a) in nodes.iter().enumerate() {
        for (j, &b) in nodes.iter().enumerate() {
            assert_eq!(dtm.is_node_after(a, b), i < j, "{i} vs {j}");
            if i != j {
                assert!(dtm.is_node_after(a, b) ^ dtm.is_node_after(b, a));
            }
        }
    }
    for w in nodes.windows(3) {
        assert!(dtm.is_node_after(w[0], w[1]) && dtm.is_node_after(w[1], w[2]));
        assert!(dtm.is_node_after(w[0], w[2]));
    }
}

/// Depth-first walk through first-child and next-sibling links only,
/// recording both links of every node reached
fn walk_links(dtm: &mut Dtm) -> Vec<(NodeHandle, Option<NodeHandle>, Option<NodeHandle>)> {
    let mut seen = Vec::new();
    let mut stack = vec![dtm.document_node()];
    while let Some(node) = stack.pop() {
        let first = dtm.first_child(node).unwrap();
        let next = dtm.next_sibling(node).unwrap();
        seen.push((node, first, next));
        stack.extend(next);
        stack.extend(first);
    }
    seen
}

#[test]
fn test_lazy_matches_eager() {
    let xml = wide_document(25);
    let mut full = eager(&xml);
    let mut lazy = Dtm::parse(xml.as_str(), DtmConfig::default()).unwrap();
    assert!(full.node_count() >= 100);

    // resolving the first links must not drain the source
    let root = lazy.document_node();
    let r = lazy.first_child(root).unwrap().unwrap();
    lazy.first_child(r).unwrap();
    assert!(!lazy.is_fully_built());

    let expected = walk_links(&mut full);
    let resolved = walk_links(&mut lazy);
    assert_eq!(resolved, expected);
    assert_eq!(lazy.node_count(), full.node_count());

    let nodes = all_nodes(&mut full);
    assert_eq!(all_nodes(&mut lazy), nodes);
    for &node in &nodes {
        assert_eq!(full.node_type(node), lazy.node_type(node));
        assert_eq!(full.level(node), lazy.level(node));
        assert_eq!(full.parent(node), lazy.parent(node));
        assert_eq!(full.previous_sibling(node), lazy.previous_sibling(node));
        assert_eq!(full.first_child(node).unwrap(), lazy.first_child(node).unwrap());
        assert_eq!(full.next_sibling(node).unwrap(), lazy.next_sibling(node).unwrap());
        assert_eq!(full.node_name(node), lazy.node_name(node));
        assert_eq!(full.node_value(node), lazy.node_value(node));
        assert_eq!(full.expanded_type(node), lazy.expanded_type(node));
    }
}

#[test]
fn test_single_steps_match_eager() {
    let xml = wide_document(25);
    let mut full = eager(&xml);
    let mut lazy = Dtm::parse(xml.as_str(), DtmConfig::default()).unwrap();
    let mut steps = 0;
    while lazy.produce_next().unwrap() {
        steps += 1;
    }
    assert!(steps > 1);
    assert_eq!(walk_links(&mut lazy), walk_links(&mut full));
}

#[test]
fn test_children_round_trip_to_parent() {
    let mut dtm = eager(SAMPLE);
    for node in all_nodes(&mut dtm) {
        let mut child = dtm.first_child(node).unwrap();
        while let Some(c) = child {
            assert_eq!(dtm.parent(c), Some(node));
            assert!(dtm.is_node_after(node, c));
            child = dtm.next_sibling(c).unwrap();
        }
    }
}

#[test]
fn test_attribute_group_follows_element() {
    let mut dtm = eager(SAMPLE);
    let nodes = all_nodes(&mut dtm);
    let kinds: Vec<NodeType> = nodes.iter().map(|&n| dtm.node_type(n)).collect();

    // r, its namespace node, then a with two attributes
    assert_eq!(
        &kinds[..6],
        [
            NodeType::Document,
            NodeType::Element,
            NodeType::Namespace,
            NodeType::Element,
            NodeType::Attribute,
            NodeType::Attribute,
        ]
    );
    let a = nodes[3];
    for &attr in &nodes[4..6] {
        assert_eq!(dtm.parent(attr), Some(a));
        assert_eq!(dtm.previous_sibling(attr), None);
        assert_eq!(dtm.next_sibling(attr).unwrap(), None);
    }
    assert_eq!(dtm.first_child(a).unwrap(), Some(nodes[6]));
    assert_eq!(dtm.node_type(nodes[6]), NodeType::Text);
}

#[rstest]
#[case::ancestor(Axis::Ancestor)]
#[case::ancestor_or_self(Axis::AncestorOrSelf)]
#[case::attribute(Axis::Attribute)]
#[case::child(Axis::Child)]
#[case::descendant(Axis::Descendant)]
#[case::descendant_or_self(Axis::DescendantOrSelf)]
#[case::following(Axis::Following)]
#[case::following_sibling(Axis::FollowingSibling)]
#[case::namespace(Axis::Namespace)]
#[case::parent(Axis::Parent)]
#[case::preceding(Axis::Preceding)]
#[case::preceding_sibling(Axis::PrecedingSibling)]
#[case::self_(Axis::Self_)]
#[case::root(Axis::Root)]
fn test_exhausted_iterators_stay_exhausted(#[case] axis: Axis) {
    let mut dtm = eager(SAMPLE);
    for start in all_nodes(&mut dtm) {
        let mut iter = AxisIterator::new(axis, NodeFilter::Any);
        iter.set_start_node(start);
        let first = iter.remaining(&mut dtm).unwrap();
        assert_eq!(iter.next_node(&mut dtm).unwrap(), None);
        assert_eq!(iter.next_node(&mut dtm).unwrap(), None);

        iter.reset();
        assert_eq!(iter.remaining(&mut dtm).unwrap(), first, "{} from {start:?}", axis.name());
    }
}

#[rstest]
#[case::forward(Axis::Following, false)]
#[case::reverse(Axis::Preceding, true)]
#[case::descendants(Axis::Descendant, false)]
#[case::ancestors(Axis::Ancestor, true)]
fn test_axis_direction(#[case] axis: Axis, #[case] reverse: bool) {
    let mut dtm = eager(SAMPLE);
    let nodes = all_nodes(&mut dtm);
    let start = nodes[nodes.len() / 2];
    let mut iter = AxisIterator::new(axis, NodeFilter::Any);
    iter.set_start_node(start);
    let found = iter.remaining(&mut dtm).unwrap();
    for pair in found.windows(2) {
        assert_eq!(dtm.is_node_after(pair[1], pair[0]), reverse);
    }
}

#[test]
fn test_inconsistent_tree_fails_build() {
    let mut tree = SourceTree::new();
    let root = tree.root_id();
    let a = tree.append_child(root, SourceData::element(QName::local("a")));
    tree.append_child(a, SourceData::Text("b".into()));
    let c = tree.append_child(root, SourceData::element(QName::local("c")));
    // a points at c, whose parent is the document
    tree.set_first_child(a, Some(c));

    let mut dtm = Dtm::from_tree(tree, DtmConfig::default()).unwrap();
    let err = dtm.build_all().unwrap_err();
    assert!(matches!(err, DtmError::InconsistentSource(_)));
    // the failure is sticky
    assert_eq!(dtm.build_all().unwrap_err(), err);
}

#[test]
fn test_manager_orders_across_documents() {
    let mut manager = DtmManager::new();
    let first = manager.add(eager("<a><b/></a>")).unwrap();
    let second = manager.add(eager("<x/>")).unwrap();
    assert_ne!(first, second);

    let last_of_first = {
        let dtm = manager.get_mut(first).unwrap();
        *all_nodes(dtm).last().unwrap()
    };
    let root_of_second = manager.get(second).unwrap().document_node();
    assert!(manager.is_node_after(last_of_first, root_of_second));
    assert!(!manager.is_node_after(root_of_second, last_of_first));

    let x = manager.first_child(root_of_second).unwrap().unwrap();
    assert_eq!(manager.node_name(x), "x");
    assert_eq!(manager.parent(x), Some(root_of_second));
    assert_eq!(manager.document(x), root_of_second);
}
