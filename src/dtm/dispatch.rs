//! Re-emitting nodes as construction events
//!
//! Serializers and copy operations consume a subtree the same way a builder
//! does: as `ContentHandler` callbacks. The walk is iterative and reads only
//! through [`Navigator`], so it works for a single DTM or a manager and pulls
//! more of a lazy document as it goes.

use super::navigator::Navigator;
use super::{NodeHandle, NodeType};
use crate::core::scanner::split_qname;
use crate::error::DtmError;
use crate::sax::{Attribute, ContentHandler, NamespaceDecl, QName};

/// Closing event owed once a container's children are done
enum Close {
    Document,
    Element(QName),
    Nothing,
}

impl Close {
    fn emit<H: ContentHandler + ?Sized>(self, handler: &mut H) -> Result<(), DtmError> {
        match self {
            Close::Document => handler.end_document(),
            Close::Element(name) => handler.end_element(&name),
            Close::Nothing => Ok(()),
        }
    }

    fn is_container(&self) -> bool {
        !matches!(self, Close::Nothing)
    }
}

/// Push the string-value of `node` as a single characters event
pub fn dispatch_characters_events<N, H>(nav: &mut N, node: NodeHandle, handler: &mut H) -> Result<(), DtmError>
where
    N: Navigator + ?Sized,
    H: ContentHandler + ?Sized,
{
    let value = nav.string_value(node)?;
    if value.is_empty() {
        return Ok(());
    }
    handler.characters(&value)
}

/// Replay the subtree rooted at `node` in document order
///
/// A document node is bracketed by document events; an attribute or namespace
/// node on its own contributes its value as character data.
pub fn dispatch_to_events<N, H>(nav: &mut N, node: NodeHandle, handler: &mut H) -> Result<(), DtmError>
where
    N: Navigator + ?Sized,
    H: ContentHandler + ?Sized,
{
    let mut open: Vec<(NodeHandle, Close)> = Vec::new();
    let mut cursor = node;
    loop {
        let close = start(nav, cursor, handler)?;
        if close.is_container() {
            if let Some(child) = nav.first_child(cursor)? {
                open.push((cursor, close));
                cursor = child;
                continue;
            }
        }
        close.emit(handler)?;

        let mut current = cursor;
        loop {
            if open.is_empty() {
                return Ok(());
            }
            if let Some(sibling) = nav.next_sibling(current)? {
                cursor = sibling;
                break;
            }
            let Some((parent, close)) = open.pop() else {
                return Ok(());
            };
            close.emit(handler)?;
            current = parent;
        }
    }
}

fn start<N, H>(nav: &mut N, node: NodeHandle, handler: &mut H) -> Result<Close, DtmError>
where
    N: Navigator + ?Sized,
    H: ContentHandler + ?Sized,
{
    match nav.node_type(node) {
        NodeType::Document => {
            handler.start_document()?;
            Ok(Close::Document)
        }
        NodeType::Element => {
            let name = qname(&*nav, node);
            let (namespaces, attributes) = element_group(nav, node)?;
            handler.start_element(&name, &namespaces, &attributes)?;
            Ok(Close::Element(name))
        }
        NodeType::Text | NodeType::Attribute | NodeType::Namespace => {
            handler.characters(nav.node_value(node))?;
            Ok(Close::Nothing)
        }
        NodeType::CData => {
            handler.cdata(nav.node_value(node))?;
            Ok(Close::Nothing)
        }
        NodeType::Comment => {
            handler.comment(nav.node_value(node))?;
            Ok(Close::Nothing)
        }
        NodeType::ProcessingInstruction => {
            handler.processing_instruction(nav.node_name(node), nav.node_value(node))?;
            Ok(Close::Nothing)
        }
    }
}

fn qname<N: Navigator + ?Sized>(nav: &N, node: NodeHandle) -> QName {
    let (prefix, _) = split_qname(nav.node_name(node));
    QName::new(nav.namespace_uri(node), prefix, nav.local_name(node))
}

/// Namespace and attribute nodes stored right after an element
fn element_group<N: Navigator + ?Sized>(
    nav: &mut N,
    element: NodeHandle,
) -> Result<(Vec<NamespaceDecl>, Vec<Attribute>), DtmError> {
    let mut namespaces = Vec::new();
    let mut attributes = Vec::new();
    let mut probe = nav.node_after(element)?;
    while let Some(node) = probe {
        match nav.node_type(node) {
            NodeType::Namespace => namespaces.push(NamespaceDecl::new(nav.node_name(node), nav.node_value(node))),
            NodeType::Attribute => attributes.push(Attribute::new(qname(&*nav, node), nav.node_value(node))),
            _ => break,
        }
        probe = nav.node_after(node)?;
    }
    Ok((namespaces, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DtmConfig;
    use crate::dtm::Dtm;
    use crate::sax::{EventRecorder, SourceEvent};

    #[test]
    fn test_element_group_rebuilt() {
        let xml = r#"<p:a xmlns:p="urn:p" p:k="v" plain="w"><!--c--><?t d?></p:a>"#;
        let mut dtm = Dtm::parse(xml, DtmConfig::default()).unwrap();
        let a = dtm.first_child(dtm.document_node()).unwrap().unwrap();
        let mut recorder = EventRecorder::new();
        dispatch_to_events(&mut dtm, a, &mut recorder).unwrap();

        let events = recorder.events();
        assert_eq!(
            events[0],
            SourceEvent::StartElement {
                name: QName::new("urn:p", "p", "a"),
                namespaces: vec![NamespaceDecl::new("p", "urn:p")],
                attributes: vec![
                    Attribute::new(QName::new("urn:p", "p", "k"), "v"),
                    Attribute::new(QName::local("plain"), "w"),
                ],
            }
        );
        assert_eq!(events[1], SourceEvent::Comment("c".into()));
        assert_eq!(
            events[2],
            SourceEvent::ProcessingInstruction {
                target: "t".into(),
                data: "d".into()
            }
        );
        assert!(events[3].is_end_element());
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_subtree_stops_at_root() {
        let mut dtm = Dtm::parse("<r><a>1<b>2</b></a><c>3</c></r>", DtmConfig::default()).unwrap();
        let r = dtm.first_child(dtm.document_node()).unwrap().unwrap();
        let a = dtm.first_child(r).unwrap().unwrap();
        let mut recorder = EventRecorder::new();
        dispatch_to_events(&mut dtm, a, &mut recorder).unwrap();
        assert_eq!(recorder.text(), "12");
        assert_eq!(recorder.event_count(), 6);
    }

    #[test]
    fn test_whole_document_bracketed() {
        let mut dtm = Dtm::parse("<r>x</r>", DtmConfig::default()).unwrap();
        let root = dtm.document_node();
        let mut recorder = EventRecorder::new();
        dispatch_to_events(&mut dtm, root, &mut recorder).unwrap();
        let events = recorder.events();
        assert_eq!(events.first(), Some(&SourceEvent::StartDocument));
        assert_eq!(events.last(), Some(&SourceEvent::EndDocument));
    }

    #[test]
    fn test_characters_events() {
        let mut dtm = Dtm::parse("<r>a<s>b</s>c</r>", DtmConfig::default()).unwrap();
        let r = dtm.first_child(dtm.document_node()).unwrap().unwrap();
        let mut recorder = EventRecorder::new();
        dispatch_characters_events(&mut dtm, r, &mut recorder).unwrap();
        assert_eq!(recorder.events(), [SourceEvent::Characters("abc".into())]);
    }
}
