//! Evaluation Strategy Module
//!
//! A single DTM and its path evaluations are strictly single-threaded. Work
//! over several independent documents can fan out:
//! - Parallel parse: one eager DTM per source text
//! - Parallel evaluation: one location path over many documents

pub mod parallel;

pub use parallel::{evaluate_parallel, parse_parallel, select_map};
