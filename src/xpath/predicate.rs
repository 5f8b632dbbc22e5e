//! Step predicates
//!
//! A predicate filters the candidates of one step. Built-in variants cover the
//! positional and simple comparison forms; anything richer comes through
//! [`PredicateExpr`], the boundary to an external expression evaluator.
//!
//! Predicates run inside a [`Scope`]: a stack of frames carrying variable
//! bindings and namespace prefixes. The location path pushes its own
//! namespace frame when an evaluation starts.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::axes::{Axis, AxisIterator, NodeFilter};
use super::compiler::LocationPath;
use super::value::PredicateValue;
use crate::dtm::{Navigator, NodeHandle, NodeType};
use crate::error::PathError;

/// External predicate evaluator
pub trait PredicateExpr: Send + Sync + fmt::Debug {
    fn evaluate(&self, ctx: &mut PredicateContext<'_>) -> Result<PredicateValue, PathError>;

    /// Whether `ctx.size()` is used; such steps buffer each context's nodes
    fn needs_context_size(&self) -> bool {
        false
    }
}

/// Everything a predicate sees about one candidate
pub struct PredicateContext<'a> {
    pub nav: &'a mut dyn Navigator,
    pub node: NodeHandle,
    /// 1-based proximity position among candidates that reached this predicate
    pub position: usize,
    pub scope: &'a Scope,
    /// Index of the predicate within its step
    pub index: usize,
    size: Option<usize>,
}

impl<'a> PredicateContext<'a> {
    pub fn new(
        nav: &'a mut dyn Navigator,
        node: NodeHandle,
        position: usize,
        size: Option<usize>,
        scope: &'a Scope,
        index: usize,
    ) -> Self {
        PredicateContext {
            nav,
            node,
            position,
            scope,
            index,
            size,
        }
    }

    /// Context size; only known for steps that buffer
    pub fn size(&self) -> Result<usize, PathError> {
        self.size.ok_or_else(|| self.fail("context size is not available on a streaming step"))
    }

    /// Error attributed to this predicate
    pub fn fail(&self, message: impl Into<String>) -> PathError {
        PathError::Predicate {
            index: self.index,
            message: message.into(),
        }
    }
}

/// A filter attached to a location step
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `[n]`
    Position(usize),
    /// `[last()]`
    Last,
    /// `[relative/path]`: true when the path selects anything
    Exists(LocationPath),
    /// `[@name = 'value']`
    AttributeEquals {
        namespace: Option<String>,
        local: String,
        value: String,
    },
    /// `[. = 'value']`
    StringValueEquals(String),
    /// `[$name]`
    Variable(String),
    Not(Box<Predicate>),
    Expr(Arc<dyn PredicateExpr>),
}

impl Predicate {
    pub fn attribute_equals(local: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::AttributeEquals {
            namespace: None,
            local: local.into(),
            value: value.into(),
        }
    }

    pub fn expr<E: PredicateExpr + 'static>(expr: E) -> Self {
        Predicate::Expr(Arc::new(expr))
    }

    pub fn needs_context_size(&self) -> bool {
        match self {
            Predicate::Last => true,
            Predicate::Not(inner) => inner.needs_context_size(),
            Predicate::Expr(expr) => expr.needs_context_size(),
            _ => false,
        }
    }

    /// Whether the candidate in `ctx` passes
    pub fn test(&self, ctx: &mut PredicateContext<'_>) -> Result<bool, PathError> {
        match self {
            Predicate::Position(n) => Ok(ctx.position == *n),
            Predicate::Last => Ok(ctx.position == ctx.size()?),
            Predicate::Exists(path) => {
                let mut evaluation = path.evaluate_in(ctx.node, ctx.scope.clone());
                Ok(evaluation.next_node(&mut *ctx.nav)?.is_some())
            }
            Predicate::AttributeEquals {
                namespace,
                local,
                value,
            } => {
                let namespace = namespace.as_deref().unwrap_or("");
                let mut attributes = AxisIterator::new(Axis::Attribute, NodeFilter::Kind(NodeType::Attribute));
                attributes.set_start_node(ctx.node);
                while let Some(attribute) = attributes.next_node(&mut *ctx.nav)? {
                    let nav = &*ctx.nav;
                    if nav.local_name(attribute) == local.as_str() && nav.namespace_uri(attribute) == namespace {
                        return Ok(nav.node_value(attribute) == value.as_str());
                    }
                }
                Ok(false)
            }
            Predicate::StringValueEquals(expected) => Ok(ctx.nav.string_value(ctx.node)? == *expected),
            Predicate::Variable(name) => {
                let value = ctx
                    .scope
                    .variable(name)
                    .ok_or_else(|| PathError::UnboundVariable(name.clone()))?;
                Ok(value.accepts(ctx.position))
            }
            Predicate::Not(inner) => Ok(!inner.test(ctx)?),
            Predicate::Expr(expr) => {
                let value = expr.evaluate(ctx)?;
                Ok(value.accepts(ctx.position))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Frame {
    variables: HashMap<String, PredicateValue>,
    namespaces: HashMap<String, String>,
}

/// Variable and namespace bindings visible to predicates
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// A scope with one empty frame
    pub fn new() -> Self {
        Scope {
            frames: vec![Frame::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Drop the innermost frame; the outermost one stays
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn bind_variable(&mut self, name: impl Into<String>, value: PredicateValue) {
        if let Some(frame) = self.frames.last_mut() {
            frame.variables.insert(name.into(), value);
        }
    }

    pub fn declare_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.namespaces.insert(prefix.into(), uri.into());
        }
    }

    /// Innermost binding of `name`
    pub fn variable(&self, name: &str) -> Option<&PredicateValue> {
        self.frames.iter().rev().find_map(|f| f.variables.get(name))
    }

    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.namespaces.get(prefix))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DtmConfig;
    use crate::dtm::Dtm;

    #[derive(Debug)]
    struct Fails;

    impl PredicateExpr for Fails {
        fn evaluate(&self, ctx: &mut PredicateContext<'_>) -> Result<PredicateValue, PathError> {
            Err(ctx.fail("boom"))
        }
    }

    fn element(xml: &str) -> (Dtm, NodeHandle) {
        let mut dtm = Dtm::parse(xml, DtmConfig::default()).unwrap();
        let root = dtm.document_node();
        let first = dtm.first_child(root).unwrap().unwrap();
        (dtm, first)
    }

    #[test]
    fn test_scope_shadowing() {
        let mut scope = Scope::new();
        scope.bind_variable("x", PredicateValue::from(1usize));
        scope.declare_namespace("p", "urn:outer");
        scope.push();
        scope.bind_variable("x", PredicateValue::from(2usize));
        assert_eq!(scope.variable("x"), Some(&PredicateValue::Number(2.0)));
        assert_eq!(scope.resolve_prefix("p"), Some("urn:outer"));
        scope.pop();
        assert_eq!(scope.variable("x"), Some(&PredicateValue::Number(1.0)));
        scope.pop();
        assert_eq!(scope.depth(), 1);
        assert_eq!(scope.variable("y"), None);
    }

    #[test]
    fn test_attribute_and_string_value() {
        let (mut dtm, a) = element(r#"<a id="7">text</a>"#);
        let scope = Scope::new();
        let mut ctx = PredicateContext::new(&mut dtm, a, 1, None, &scope, 0);
        assert!(Predicate::attribute_equals("id", "7").test(&mut ctx).unwrap());
        assert!(!Predicate::attribute_equals("id", "8").test(&mut ctx).unwrap());
        assert!(!Predicate::attribute_equals("missing", "7").test(&mut ctx).unwrap());
        assert!(Predicate::StringValueEquals("text".into()).test(&mut ctx).unwrap());
        assert!(Predicate::Not(Box::new(Predicate::Position(2))).test(&mut ctx).unwrap());
    }

    #[test]
    fn test_last_needs_size() {
        let (mut dtm, a) = element("<a/>");
        let scope = Scope::new();
        assert!(Predicate::Last.needs_context_size());
        let mut streaming = PredicateContext::new(&mut dtm, a, 1, None, &scope, 2);
        let err = Predicate::Last.test(&mut streaming).unwrap_err();
        assert!(matches!(err, PathError::Predicate { index: 2, .. }));

        let mut buffered = PredicateContext::new(&mut dtm, a, 3, Some(3), &scope, 0);
        assert!(Predicate::Last.test(&mut buffered).unwrap());
    }

    #[test]
    fn test_variables() {
        let (mut dtm, a) = element("<a/>");
        let mut scope = Scope::new();
        scope.bind_variable("pos", PredicateValue::from(1usize));
        let mut ctx = PredicateContext::new(&mut dtm, a, 1, None, &scope, 0);
        assert!(Predicate::Variable("pos".into()).test(&mut ctx).unwrap());
        assert_eq!(
            Predicate::Variable("nope".into()).test(&mut ctx).unwrap_err(),
            PathError::UnboundVariable("nope".into())
        );
    }

    #[test]
    fn test_expr_error_carries_index() {
        let (mut dtm, a) = element("<a/>");
        let scope = Scope::new();
        let mut ctx = PredicateContext::new(&mut dtm, a, 1, None, &scope, 4);
        let err = Predicate::expr(Fails).test(&mut ctx).unwrap_err();
        assert_eq!(
            err,
            PathError::Predicate {
                index: 4,
                message: "boom".into()
            }
        );
    }
}
