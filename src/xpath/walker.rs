//! Step-by-step path evaluation
//!
//! A [`PathEvaluation`] keeps one walker per location step in an arena. Walker
//! `i` takes its contexts from walker `i - 1` (walker 0 from the evaluation's
//! context node), opens one axis cursor per context and merges the cursors in
//! a min-heap keyed by the node each one would yield next.
//!
//! Merging alone does not give document order: a context that has not been
//! opened yet may still produce a node before the heap's minimum. Before
//! emitting, a walker computes a lower bound on everything its unopened
//! contexts could still contribute. If the heap minimum lies beyond that
//! bound, the walker goes WAITING and pulls another context from upstream
//! first. Contexts arrive in document order, so the bound only depends on the
//! next context and on the last node emitted.
//!
//! Reverse-axis steps, and steps whose predicates need the context size,
//! buffer each context's nodes: positions are counted in axis order and the
//! survivors are replayed in document order.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use tracing::trace;

use super::axes::{Axis, AxisIterator};
use super::compiler::{LocationPath, Step};
use super::predicate::{PredicateContext, Scope};
use super::value::PredicateValue;
use crate::dtm::{Navigator, NodeHandle};
use crate::error::PathError;

/// Lifecycle of one walker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkerState {
    /// No context yet
    Fresh,
    Active,
    /// Pulling more contexts before it may emit
    Waiting,
    /// Upstream and every cursor are exhausted
    Done,
}

#[derive(Debug)]
enum StepCursor {
    Streaming { iter: AxisIterator, counters: Vec<usize> },
    Buffered(VecDeque<NodeHandle>),
}

/// One opened context, keyed by the node it yields next
#[derive(Debug)]
struct Pending {
    head: NodeHandle,
    seq: u64,
    cursor: StepCursor,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.head, self.seq).cmp(&(other.head, other.seq))
    }
}

#[derive(Debug)]
struct Walker {
    state: WalkerState,
    pending: BinaryHeap<Reverse<Pending>>,
    /// Next context, pulled but not opened
    lookahead: Option<NodeHandle>,
    upstream_done: bool,
    last_emitted: Option<NodeHandle>,
    /// Cursor whose head was just taken; advanced on the next pull
    resume: Option<Pending>,
    seq: u64,
    waits: usize,
}

impl Walker {
    fn new() -> Self {
        Walker {
            state: WalkerState::Fresh,
            pending: BinaryHeap::new(),
            lookahead: None,
            upstream_done: false,
            last_emitted: None,
            resume: None,
            seq: 0,
            waits: 0,
        }
    }
}

/// In-progress evaluation of a [`LocationPath`] from one context node
#[derive(Debug)]
pub struct PathEvaluation<'p> {
    path: &'p LocationPath,
    context: NodeHandle,
    context_taken: bool,
    walkers: Vec<Walker>,
    waiting: Vec<usize>,
    scope: Scope,
    failed: bool,
}

impl<'p> PathEvaluation<'p> {
    pub(crate) fn new(path: &'p LocationPath, context: NodeHandle, scope: Scope) -> Self {
        PathEvaluation {
            path,
            context,
            context_taken: false,
            walkers: path.steps().iter().map(|_| Walker::new()).collect(),
            waiting: Vec::new(),
            scope,
            failed: false,
        }
    }

    /// Bind a variable for the predicates of this evaluation
    pub fn with_variable(mut self, name: impl Into<String>, value: PredicateValue) -> Self {
        self.scope.bind_variable(name, value);
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn context(&self) -> NodeHandle {
        self.context
    }

    /// Indices of walkers currently WAITING
    ///
    /// A walker leaves WAITING before it hands out a node, so between calls to
    /// [`next_node`](Self::next_node) this is empty; [`wait_count`](Self::wait_count)
    /// keeps the history.
    pub fn waiting(&self) -> &[usize] {
        &self.waiting
    }

    /// How often walker `index` has entered WAITING since the last reset
    pub fn wait_count(&self, index: usize) -> Option<usize> {
        self.walkers.get(index).map(|w| w.waits)
    }

    pub fn walker_state(&self, index: usize) -> Option<WalkerState> {
        self.walkers.get(index).map(|w| w.state)
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Start over from the same context, keeping variable bindings
    pub fn reset(&mut self) {
        self.walkers.iter_mut().for_each(|w| *w = Walker::new());
        self.waiting.clear();
        self.context_taken = false;
        self.failed = false;
    }

    /// Next selected node in document order; `None` once exhausted
    ///
    /// An error poisons the evaluation: every later call reports `Aborted`.
    pub fn next_node(&mut self, nav: &mut dyn Navigator) -> Result<Option<NodeHandle>, PathError> {
        if self.failed {
            return Err(PathError::Aborted);
        }
        let Some(last) = self.walkers.len().checked_sub(1) else {
            return Ok(None);
        };
        match self.pull(last, nav) {
            Ok(node) => Ok(node),
            Err(err) => {
                trace!(error = %err, "path evaluation aborted");
                self.failed = true;
                Err(err)
            }
        }
    }

    /// Drain the evaluation; an error discards everything selected so far
    pub fn collect(mut self, nav: &mut dyn Navigator) -> Result<Vec<NodeHandle>, PathError> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next_node(nav)? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn upstream(&mut self, index: usize, nav: &mut dyn Navigator) -> Result<Option<NodeHandle>, PathError> {
        if index > 0 {
            return self.pull(index - 1, nav);
        }
        if self.context_taken {
            return Ok(None);
        }
        self.context_taken = true;
        Ok(Some(self.context))
    }

    fn pull(&mut self, index: usize, nav: &mut dyn Navigator) -> Result<Option<NodeHandle>, PathError> {
        let path = self.path;
        let step = &path.steps()[index];
        loop {
            if self.walkers[index].state == WalkerState::Done {
                return Ok(None);
            }
            if let Some(mut pending) = self.walkers[index].resume.take() {
                if let Some(next) = advance(&mut pending.cursor, step, nav, &self.scope)? {
                    pending.head = next;
                    self.walkers[index].pending.push(Reverse(pending));
                }
            }
            if self.walkers[index].lookahead.is_none() && !self.walkers[index].upstream_done {
                match self.upstream(index, nav)? {
                    Some(context) => self.walkers[index].lookahead = Some(context),
                    None => self.walkers[index].upstream_done = true,
                }
            }

            let walker = &self.walkers[index];
            let head = walker.pending.peek().map(|p| p.0.head);
            match (head, walker.lookahead) {
                (None, None) => {
                    self.set_state(index, WalkerState::Done);
                    return Ok(None);
                }
                (None, Some(context)) => {
                    self.open(index, step, context, nav)?;
                    continue;
                }
                (Some(head), Some(context)) => {
                    let bound = wait_bound(step.axis, context, walker.last_emitted, nav)?;
                    if bound < head {
                        self.set_state(index, WalkerState::Waiting);
                        self.open(index, step, context, nav)?;
                        continue;
                    }
                }
                (Some(_), None) => {}
            }

            let walker = &mut self.walkers[index];
            let Some(Reverse(pending)) = walker.pending.pop() else {
                continue;
            };
            let node = pending.head;
            walker.resume = Some(pending);
            // a later context re-producing a node emitted before `last` lands below it
            if walker.last_emitted.is_some_and(|last| node <= last) {
                continue;
            }
            walker.last_emitted = Some(node);
            self.set_state(index, WalkerState::Active);
            trace!(step = index, node = ?node, "walker emit");
            return Ok(Some(node));
        }
    }

    /// Open a cursor for `context` and queue it under its first node
    fn open(&mut self, index: usize, step: &Step, context: NodeHandle, nav: &mut dyn Navigator) -> Result<(), PathError> {
        self.walkers[index].lookahead = None;
        let mut cursor = open_cursor(step, context, nav, &self.scope)?;
        let first = advance(&mut cursor, step, nav, &self.scope)?;
        let walker = &mut self.walkers[index];
        if walker.state == WalkerState::Fresh {
            walker.state = WalkerState::Active;
        }
        trace!(step = index, axis = step.axis.name(), context = ?context, empty = first.is_none(), "walker opened context");
        if let Some(head) = first {
            walker.seq += 1;
            walker.pending.push(Reverse(Pending {
                head,
                seq: walker.seq,
                cursor,
            }));
        }
        Ok(())
    }

    fn set_state(&mut self, index: usize, state: WalkerState) {
        let walker = &mut self.walkers[index];
        if walker.state == state {
            return;
        }
        trace!(step = index, from = ?walker.state, to = ?state, "walker state");
        walker.state = state;
        if state == WalkerState::Waiting {
            walker.waits += 1;
            self.waiting.push(index);
        } else {
            self.waiting.retain(|&w| w != index);
        }
    }
}

fn open_cursor(
    step: &Step,
    context: NodeHandle,
    nav: &mut dyn Navigator,
    scope: &Scope,
) -> Result<StepCursor, PathError> {
    let mut iter = AxisIterator::new(step.axis, step.filter);
    iter.set_start_node(context);
    if !step.buffered {
        return Ok(StepCursor::Streaming {
            iter,
            counters: vec![0; step.predicates.len()],
        });
    }

    // axis order, so positions count nearest-first on reverse axes
    let mut nodes = Vec::new();
    while let Some(node) = iter.next_node(nav)? {
        if step.test.matches(&*nav, node, step.axis) {
            nodes.push(node);
        }
    }
    for (index, predicate) in step.predicates.iter().enumerate() {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, &node) in nodes.iter().enumerate() {
            let mut ctx = PredicateContext::new(&mut *nav, node, i + 1, Some(size), scope, index);
            if predicate.test(&mut ctx)? {
                kept.push(node);
            }
        }
        nodes = kept;
    }
    if step.axis.is_reverse() {
        nodes.reverse();
    }
    Ok(StepCursor::Buffered(nodes.into()))
}

/// Next node of one context that passes the node test and every predicate
fn advance(
    cursor: &mut StepCursor,
    step: &Step,
    nav: &mut dyn Navigator,
    scope: &Scope,
) -> Result<Option<NodeHandle>, PathError> {
    let (iter, counters) = match cursor {
        StepCursor::Buffered(nodes) => return Ok(nodes.pop_front()),
        StepCursor::Streaming { iter, counters } => (iter, counters),
    };
    'candidates: while let Some(node) = iter.next_node(nav)? {
        if !step.test.matches(&*nav, node, step.axis) {
            continue;
        }
        for (index, predicate) in step.predicates.iter().enumerate() {
            counters[index] += 1;
            let mut ctx = PredicateContext::new(&mut *nav, node, counters[index], None, scope, index);
            if !predicate.test(&mut ctx)? {
                continue 'candidates;
            }
        }
        return Ok(Some(node));
    }
    Ok(None)
}

/// Lower bound on any node above `last` that contexts from `context` onward
/// can still produce on `axis`
fn wait_bound(
    axis: Axis,
    context: NodeHandle,
    last: Option<NodeHandle>,
    nav: &mut dyn Navigator,
) -> Result<NodeHandle, PathError> {
    let above_last = |node: NodeHandle| last.is_none_or(|l| node > l);
    Ok(match axis {
        Axis::Child
        | Axis::Descendant
        | Axis::DescendantOrSelf
        | Axis::Following
        | Axis::FollowingSibling
        | Axis::Attribute
        | Axis::Self_ => context,
        Axis::Root => {
            let document = nav.document(context);
            if above_last(document) {
                document
            } else {
                context
            }
        }
        // an ancestor below the context is an ancestor of the context itself
        Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf => topmost_ancestor(&*nav, context, above_last),
        Axis::Namespace => {
            // namespace nodes of elements before last's owner are all behind it
            let floor = last.and_then(|l| nav.parent(l));
            topmost_ancestor(&*nav, context, |node| floor.is_none_or(|f| node >= f))
        }
        Axis::PrecedingSibling => {
            let mut bound = context;
            let mut current = context;
            while let Some(parent) = nav.parent(current) {
                if let Some(first) = nav.first_child(parent)? {
                    let candidate = match last {
                        Some(l) if first <= l => successor(l),
                        _ => first,
                    };
                    bound = bound.min(candidate);
                }
                current = parent;
            }
            bound
        }
        Axis::Preceding => {
            let document = nav.document(context);
            match last {
                Some(l) => document.max(successor(l)),
                None => document,
            }
        }
    })
}

/// Topmost ancestor-or-self of `context` accepted by `keep`, walking up while
/// it keeps accepting; `context` when none is
fn topmost_ancestor(nav: &dyn Navigator, context: NodeHandle, keep: impl Fn(NodeHandle) -> bool) -> NodeHandle {
    let mut bound = context;
    let mut current = nav.parent(context);
    while let Some(ancestor) = current {
        if !keep(ancestor) {
            break;
        }
        bound = ancestor;
        current = nav.parent(ancestor);
    }
    bound
}

/// Handle ordered immediately after `node`; used only as a comparison key
#[inline]
fn successor(node: NodeHandle) -> NodeHandle {
    NodeHandle::from_raw(node.raw().saturating_add(1))
}
