//! XPath Location Paths
//!
//! Location path evaluation over a DTM:
//! - All 13 XPath 1.0 axes plus `root`, as lazy [`AxisIterator`]s
//! - Step opcodes compiled into a [`LocationPath`]
//! - Document-order merging of multi-step paths in [`PathEvaluation`]
//! - Compiled path caching

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod predicate;
pub mod value;
pub mod walker;

pub use axes::{Axis, AxisIterator, NodeFilter};
pub use cache::PathCache;
pub use compiler::{opcodes, LocationPath, LocationPathBuilder, NodeTest, StepOp};
pub use predicate::{Predicate, PredicateContext, PredicateExpr, Scope};
pub use value::PredicateValue;
pub use walker::{PathEvaluation, WalkerState};
