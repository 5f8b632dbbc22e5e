//! Location Path Compiler
//!
//! Turns a stream of step operations, as produced by an XPath front end,
//! into a [`LocationPath`]: one compiled step per location step, each with
//! its axis, node test, typed pre-filter and predicates.

use tracing::debug;

use super::axes::{Axis, NodeFilter};
use super::predicate::{Predicate, Scope};
use super::walker::PathEvaluation;
use crate::dtm::{Navigator, NodeHandle, NodeType};
use crate::error::PathError;

/// Step-type opcodes of the path compiler
pub mod opcodes {
    pub const FROM_ANCESTORS: u32 = 37;
    pub const FROM_ANCESTORS_OR_SELF: u32 = 38;
    pub const FROM_ATTRIBUTES: u32 = 39;
    pub const FROM_CHILDREN: u32 = 40;
    pub const FROM_DESCENDANTS: u32 = 41;
    pub const FROM_DESCENDANTS_OR_SELF: u32 = 42;
    pub const FROM_FOLLOWING: u32 = 43;
    pub const FROM_FOLLOWING_SIBLINGS: u32 = 44;
    pub const FROM_PARENT: u32 = 45;
    pub const FROM_PRECEDING: u32 = 46;
    pub const FROM_PRECEDING_SIBLINGS: u32 = 47;
    pub const FROM_SELF: u32 = 48;
    pub const FROM_NAMESPACE: u32 = 49;
    pub const FROM_ROOT: u32 = 50;
}

/// Axis a step opcode selects
pub fn axis_for_op(op: u32) -> Option<Axis> {
    use opcodes::*;
    Some(match op {
        FROM_ANCESTORS => Axis::Ancestor,
        FROM_ANCESTORS_OR_SELF => Axis::AncestorOrSelf,
        FROM_ATTRIBUTES => Axis::Attribute,
        FROM_CHILDREN => Axis::Child,
        FROM_DESCENDANTS => Axis::Descendant,
        FROM_DESCENDANTS_OR_SELF => Axis::DescendantOrSelf,
        FROM_FOLLOWING => Axis::Following,
        FROM_FOLLOWING_SIBLINGS => Axis::FollowingSibling,
        FROM_PARENT => Axis::Parent,
        FROM_PRECEDING => Axis::Preceding,
        FROM_PRECEDING_SIBLINGS => Axis::PrecedingSibling,
        FROM_SELF => Axis::Self_,
        FROM_NAMESPACE => Axis::Namespace,
        FROM_ROOT => Axis::Root,
        _ => return None,
    })
}

/// Opcode for an axis
pub fn op_for_axis(axis: Axis) -> u32 {
    use opcodes::*;
    match axis {
        Axis::Ancestor => FROM_ANCESTORS,
        Axis::AncestorOrSelf => FROM_ANCESTORS_OR_SELF,
        Axis::Attribute => FROM_ATTRIBUTES,
        Axis::Child => FROM_CHILDREN,
        Axis::Descendant => FROM_DESCENDANTS,
        Axis::DescendantOrSelf => FROM_DESCENDANTS_OR_SELF,
        Axis::Following => FROM_FOLLOWING,
        Axis::FollowingSibling => FROM_FOLLOWING_SIBLINGS,
        Axis::Parent => FROM_PARENT,
        Axis::Preceding => FROM_PRECEDING,
        Axis::PrecedingSibling => FROM_PRECEDING_SIBLINGS,
        Axis::Self_ => FROM_SELF,
        Axis::Namespace => FROM_NAMESPACE,
        Axis::Root => FROM_ROOT,
    }
}

/// Node test of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `node()`
    AnyNode,
    /// `*`: any node of the axis's principal kind
    Principal,
    /// A name; `namespace` is the URI, `None` for no namespace
    Name {
        namespace: Option<String>,
        local: String,
    },
    /// `prefix:*`, already resolved to a URI
    NamespaceWildcard(String),
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl NodeTest {
    pub fn name(local: impl Into<String>) -> Self {
        NodeTest::Name {
            namespace: None,
            local: local.into(),
        }
    }

    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        NodeTest::Name {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    pub fn matches<N: Navigator + ?Sized>(&self, nav: &N, node: NodeHandle, axis: Axis) -> bool {
        let kind = nav.node_type(node);
        match self {
            NodeTest::AnyNode => true,
            NodeTest::Principal => kind == axis.principal_kind(),
            NodeTest::Name { namespace, local } => {
                kind == axis.principal_kind()
                    && nav.local_name(node) == local.as_str()
                    && nav.namespace_uri(node) == namespace.as_deref().unwrap_or("")
            }
            NodeTest::NamespaceWildcard(uri) => {
                kind == axis.principal_kind() && nav.namespace_uri(node) == uri.as_str()
            }
            NodeTest::Text => kind.is_text(),
            NodeTest::Comment => kind == NodeType::Comment,
            NodeTest::ProcessingInstruction(target) => {
                kind == NodeType::ProcessingInstruction
                    && target.as_deref().is_none_or(|t| nav.local_name(node) == t)
            }
        }
    }

    /// Kind-level filter the axis iterator can apply before the full test
    fn prefilter(&self, axis: Axis) -> NodeFilter {
        match self {
            NodeTest::AnyNode => NodeFilter::Any,
            NodeTest::Principal | NodeTest::Name { .. } | NodeTest::NamespaceWildcard(_) => {
                NodeFilter::Kind(axis.principal_kind())
            }
            NodeTest::Text => NodeFilter::TextLike,
            NodeTest::Comment => NodeFilter::Kind(NodeType::Comment),
            NodeTest::ProcessingInstruction(_) => NodeFilter::Kind(NodeType::ProcessingInstruction),
        }
    }
}

/// One entry of the opcode stream
#[derive(Debug, Clone)]
pub struct StepOp {
    pub op: u32,
    pub test: NodeTest,
    pub predicates: Vec<Predicate>,
}

impl StepOp {
    pub fn new(op: u32, test: NodeTest) -> Self {
        StepOp {
            op,
            test,
            predicates: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

/// A compiled location step
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub filter: NodeFilter,
    pub predicates: Vec<Predicate>,
    /// Collect each context's nodes before filtering: reverse axes and
    /// predicates that need the context size
    pub buffered: bool,
}

impl Step {
    fn compile(op: &StepOp) -> Result<Self, PathError> {
        let axis = axis_for_op(op.op).ok_or(PathError::UnknownStepType(op.op))?;
        let buffered = axis.is_reverse() || op.predicates.iter().any(Predicate::needs_context_size);
        Ok(Step {
            axis,
            filter: op.test.prefilter(axis),
            test: op.test.clone(),
            predicates: op.predicates.clone(),
            buffered,
        })
    }
}

/// A compiled relative location path
#[derive(Debug, Clone)]
pub struct LocationPath {
    steps: Vec<Step>,
    namespaces: Vec<(String, String)>,
}

impl LocationPath {
    /// Compile an opcode stream
    pub fn compile(ops: &[StepOp]) -> Result<Self, PathError> {
        if ops.is_empty() {
            return Err(PathError::EmptyPath);
        }
        let steps = ops.iter().map(Step::compile).collect::<Result<Vec<_>, _>>()?;
        debug!(
            steps = steps.len(),
            buffered = steps.iter().filter(|s| s.buffered).count(),
            "location path compiled"
        );
        Ok(LocationPath {
            steps,
            namespaces: Vec::new(),
        })
    }

    pub fn builder() -> LocationPathBuilder {
        LocationPathBuilder::default()
    }

    /// Bind a prefix in the scope predicates run in
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.push((prefix.into(), uri.into()));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Start evaluating from `context`
    pub fn evaluate(&self, context: NodeHandle) -> PathEvaluation<'_> {
        self.evaluate_in(context, Scope::new())
    }

    /// Start evaluating inside an existing scope; the path's namespace
    /// bindings go in a frame of their own
    pub fn evaluate_in(&self, context: NodeHandle, mut scope: Scope) -> PathEvaluation<'_> {
        scope.push();
        for (prefix, uri) in &self.namespaces {
            scope.declare_namespace(prefix.as_str(), uri.as_str());
        }
        PathEvaluation::new(self, context, scope)
    }

    /// Every selected node, in document order
    pub fn select(&self, nav: &mut dyn Navigator, context: NodeHandle) -> Result<Vec<NodeHandle>, PathError> {
        self.evaluate(context).collect(nav)
    }
}

/// Typed construction of a [`LocationPath`]
#[derive(Debug, Default)]
pub struct LocationPathBuilder {
    ops: Vec<StepOp>,
    namespaces: Vec<(String, String)>,
}

impl LocationPathBuilder {
    pub fn step(mut self, axis: Axis, test: NodeTest) -> Self {
        self.ops.push(StepOp::new(op_for_axis(axis), test));
        self
    }

    /// Attach a predicate to the most recent step
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        if let Some(op) = self.ops.last_mut() {
            op.predicates.push(predicate);
        }
        self
    }

    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.push((prefix.into(), uri.into()));
        self
    }

    pub fn build(self) -> Result<LocationPath, PathError> {
        let mut path = LocationPath::compile(&self.ops)?;
        path.namespaces = self.namespaces;
        Ok(path)
    }
}
