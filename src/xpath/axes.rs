//! XPath Axis Iterators
//!
//! All 13 XPath 1.0 axes plus `root`:
//! - child, parent, self, root
//! - descendant, descendant-or-self
//! - ancestor, ancestor-or-self
//! - following, following-sibling
//! - preceding, preceding-sibling
//! - attribute, namespace
//!
//! An [`AxisIterator`] walks one axis from one start node, pulling nodes from
//! a [`Navigator`] only as it needs them. Forward axes yield in document
//! order; reverse axes yield nearest-first (reverse document order), which is
//! the order proximity positions are counted in.

use crate::dtm::{Navigator, NodeHandle, NodeType};
use crate::error::DtmError;

/// Traversal direction of a location step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    Self_,
    /// Document node of the context
    Root,
}

impl Axis {
    /// Axes whose natural order runs against document order
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Parent | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    /// Node kind a name test selects on this axis
    pub fn principal_kind(self) -> NodeType {
        match self {
            Axis::Attribute => NodeType::Attribute,
            Axis::Namespace => NodeType::Namespace,
            _ => NodeType::Element,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Self_ => "self",
            Axis::Root => "root",
        }
    }
}

/// Typed filter applied inside [`AxisIterator::next_node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFilter {
    Any,
    Kind(NodeType),
    /// Text and CDATA nodes
    TextLike,
    /// One expanded type id of the owning DTM
    Expanded(u32),
}

impl NodeFilter {
    #[inline]
    pub fn accepts<N: Navigator + ?Sized>(&self, nav: &N, node: NodeHandle) -> bool {
        match *self {
            NodeFilter::Any => true,
            NodeFilter::Kind(kind) => nav.node_type(node) == kind,
            NodeFilter::TextLike => nav.node_type(node).is_text(),
            NodeFilter::Expanded(id) => nav.expanded_type(node) == id,
        }
    }
}

/// Where an iterator resumes; most variants hold the node yielded last
#[derive(Debug, Clone)]
enum Cursor {
    Fresh,
    Sibling(NodeHandle),
    Back(NodeHandle),
    Up(NodeHandle),
    Descend { last: NodeHandle, floor: u16 },
    Forward(NodeHandle),
    Preceding { last: NodeHandle, ancestors: Vec<NodeHandle> },
    Attrs(NodeHandle),
    List { items: Vec<NodeHandle>, pos: usize },
    Done,
}

/// Cursor over one axis from one start node
#[derive(Debug, Clone)]
pub struct AxisIterator {
    axis: Axis,
    filter: NodeFilter,
    restartable: bool,
    start: Option<NodeHandle>,
    cursor: Cursor,
}

impl AxisIterator {
    /// Restartable iterator with no start node yet
    pub fn new(axis: Axis, filter: NodeFilter) -> Self {
        AxisIterator {
            axis,
            filter,
            restartable: true,
            start: None,
            cursor: Cursor::Fresh,
        }
    }

    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[inline]
    pub fn filter(&self) -> NodeFilter {
        self.filter
    }

    #[inline]
    pub fn is_reverse(&self) -> bool {
        self.axis.is_reverse()
    }

    pub fn is_restartable(&self) -> bool {
        self.restartable
    }

    pub fn start_node(&self) -> Option<NodeHandle> {
        self.start
    }

    /// Re-root the iterator; a duplicated cursor keeps its start node
    pub fn set_start_node(&mut self, node: NodeHandle) -> &mut Self {
        if self.restartable {
            self.start = Some(node);
            self.cursor = Cursor::Fresh;
        }
        self
    }

    /// Rewind to just after the last `set_start_node`
    pub fn reset(&mut self) {
        self.cursor = Cursor::Fresh;
    }

    /// Independent copy of the current position that cannot be re-rooted
    pub fn duplicate_cursor(&self) -> Self {
        AxisIterator {
            restartable: false,
            ..self.clone()
        }
    }

    /// Next node that passes the filter; `None` forever once exhausted
    pub fn next_node<N: Navigator + ?Sized>(&mut self, nav: &mut N) -> Result<Option<NodeHandle>, DtmError> {
        let Some(start) = self.start else {
            return Ok(None);
        };
        loop {
            match self.step(nav, start)? {
                Some(node) if self.filter.accepts(&*nav, node) => return Ok(Some(node)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Drain everything left on the axis
    pub fn remaining<N: Navigator + ?Sized>(&mut self, nav: &mut N) -> Result<Vec<NodeHandle>, DtmError> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next_node(nav)? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn step<N: Navigator + ?Sized>(&mut self, nav: &mut N, start: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
        if matches!(self.cursor, Cursor::Fresh) {
            let (next, cursor) = self.first(nav, start)?;
            self.cursor = if next.is_some() { cursor } else { Cursor::Done };
            return Ok(next);
        }
        let next = match &mut self.cursor {
            Cursor::Done | Cursor::Fresh => return Ok(None),
            Cursor::Sibling(last) => track(last, nav.next_sibling(*last)?),
            Cursor::Back(last) => track(last, nav.previous_sibling(*last)),
            Cursor::Up(last) => track(last, nav.parent(*last)),
            Cursor::Descend { last, floor } => {
                let next = next_within(nav, *last, *floor)?;
                track(last, next)
            }
            Cursor::Forward(last) => track(last, next_in_order(nav, *last)?),
            Cursor::Preceding { last, ancestors } => {
                let next = previous_outside(&*nav, *last, ancestors);
                track(last, next)
            }
            Cursor::Attrs(last) => track(last, next_attribute(nav, *last)?),
            Cursor::List { items, pos } => {
                let next = items.get(*pos).copied();
                *pos += 1;
                next
            }
        };
        if next.is_none() {
            self.cursor = Cursor::Done;
        }
        Ok(next)
    }

    /// First raw node of the axis and the cursor that continues from it
    fn first<N: Navigator + ?Sized>(
        &self,
        nav: &mut N,
        start: NodeHandle,
    ) -> Result<(Option<NodeHandle>, Cursor), DtmError> {
        let attribute_like = nav.node_type(start).is_attribute_like();
        Ok(match self.axis {
            Axis::Child => {
                let next = nav.first_child(start)?;
                (next, resume(next, Cursor::Sibling))
            }
            Axis::FollowingSibling => {
                let next = nav.next_sibling(start)?;
                (next, resume(next, Cursor::Sibling))
            }
            Axis::PrecedingSibling => {
                let next = nav.previous_sibling(start);
                (next, resume(next, Cursor::Back))
            }
            Axis::Parent => (nav.parent(start), Cursor::Done),
            Axis::Ancestor => {
                let next = nav.parent(start);
                (next, resume(next, Cursor::Up))
            }
            Axis::AncestorOrSelf => (Some(start), Cursor::Up(start)),
            Axis::Self_ => (Some(start), Cursor::Done),
            Axis::Root => (Some(nav.document(start)), Cursor::Done),
            Axis::Descendant if attribute_like => (None, Cursor::Done),
            Axis::Descendant => {
                let floor = nav.level(start);
                let next = next_within(nav, start, floor)?;
                (next, resume(next, |last| Cursor::Descend { last, floor }))
            }
            Axis::DescendantOrSelf if attribute_like => (Some(start), Cursor::Done),
            Axis::DescendantOrSelf => {
                let floor = nav.level(start);
                (Some(start), Cursor::Descend { last: start, floor })
            }
            Axis::Following => {
                let next = if attribute_like {
                    next_in_order(nav, start)?
                } else {
                    first_following(nav, start)?
                };
                (next, resume(next, Cursor::Forward))
            }
            Axis::Preceding => {
                let mut ancestors = Vec::new();
                let mut current = nav.parent(start);
                while let Some(ancestor) = current {
                    ancestors.push(ancestor);
                    current = nav.parent(ancestor);
                }
                // nearest ancestor on top
                ancestors.reverse();
                let next = previous_outside(&*nav, start, &mut ancestors);
                (next, resume(next, |last| Cursor::Preceding { last, ancestors }))
            }
            Axis::Attribute if nav.node_type(start) == NodeType::Element => {
                let next = next_attribute(nav, start)?;
                (next, resume(next, Cursor::Attrs))
            }
            Axis::Attribute => (None, Cursor::Done),
            Axis::Namespace => {
                let items = in_scope_namespaces(nav, start)?;
                let next = items.first().copied();
                (next, Cursor::List { items, pos: 1 })
            }
        })
    }
}

#[inline]
fn track(last: &mut NodeHandle, next: Option<NodeHandle>) -> Option<NodeHandle> {
    if let Some(node) = next {
        *last = node;
    }
    next
}

#[inline]
fn resume(next: Option<NodeHandle>, cursor: impl FnOnce(NodeHandle) -> Cursor) -> Cursor {
    next.map_or(Cursor::Done, cursor)
}

/// Next non-attribute node after `last` that is still deeper than `floor`
fn next_within<N: Navigator + ?Sized>(
    nav: &mut N,
    last: NodeHandle,
    floor: u16,
) -> Result<Option<NodeHandle>, DtmError> {
    let mut probe = nav.node_after(last)?;
    while let Some(node) = probe {
        if nav.level(node) <= floor {
            return Ok(None);
        }
        if !nav.node_type(node).is_attribute_like() {
            return Ok(Some(node));
        }
        probe = nav.node_after(node)?;
    }
    Ok(None)
}

/// Next non-attribute node in document order
fn next_in_order<N: Navigator + ?Sized>(nav: &mut N, last: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
    let mut probe = nav.node_after(last)?;
    while let Some(node) = probe {
        if !nav.node_type(node).is_attribute_like() {
            return Ok(Some(node));
        }
        probe = nav.node_after(node)?;
    }
    Ok(None)
}

/// First node after the subtree of `start`
fn first_following<N: Navigator + ?Sized>(nav: &mut N, start: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
    let mut current = start;
    loop {
        if let Some(sibling) = nav.next_sibling(current)? {
            return Ok(Some(sibling));
        }
        match nav.parent(current) {
            Some(parent) => current = parent,
            None => return Ok(None),
        }
    }
}

/// Previous non-attribute node that is not an ancestor of the start
fn previous_outside<N: Navigator + ?Sized>(
    nav: &N,
    last: NodeHandle,
    ancestors: &mut Vec<NodeHandle>,
) -> Option<NodeHandle> {
    let mut probe = nav.node_before(last);
    while let Some(node) = probe {
        if ancestors.last() == Some(&node) {
            ancestors.pop();
        } else if !nav.node_type(node).is_attribute_like() {
            return Some(node);
        }
        probe = nav.node_before(node);
    }
    None
}

/// Next attribute of the element group `last` belongs to
fn next_attribute<N: Navigator + ?Sized>(nav: &mut N, last: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
    let mut probe = nav.node_after(last)?;
    while let Some(node) = probe {
        match nav.node_type(node) {
            NodeType::Attribute => return Ok(Some(node)),
            NodeType::Namespace => probe = nav.node_after(node)?,
            _ => return Ok(None),
        }
    }
    Ok(None)
}

/// Namespace nodes in scope at `element`, in document order
///
/// The nearest declaration of a prefix wins and an empty URI un-declares it.
fn in_scope_namespaces<N: Navigator + ?Sized>(nav: &mut N, element: NodeHandle) -> Result<Vec<NodeHandle>, DtmError> {
    let mut nodes = Vec::new();
    if nav.node_type(element) != NodeType::Element {
        return Ok(nodes);
    }
    let mut seen: Vec<String> = Vec::new();
    let mut current = Some(element);
    while let Some(owner) = current {
        if nav.node_type(owner) == NodeType::Element {
            let mut probe = nav.node_after(owner)?;
            while let Some(node) = probe {
                if nav.node_type(node) != NodeType::Namespace {
                    break;
                }
                let prefix = nav.node_name(node);
                if !seen.iter().any(|p| p == prefix) {
                    seen.push(prefix.to_string());
                    if !nav.node_value(node).is_empty() {
                        nodes.push(node);
                    }
                }
                probe = nav.node_after(node)?;
            }
        }
        current = nav.parent(owner);
    }
    nodes.sort_unstable();
    Ok(nodes)
}
