#![doc(test(attr(deny(warnings))))]

//! Turns raw SPARQL text into a canonical, cache-friendly form and plans how it is sent to the
//! backend.
//!
//! The [`PreparedQuery`] is the entry point: it strips the non-standard preamble, parses the
//! remainder with [`spargebra`] and relabels blank nodes deterministically so that two
//! structurally identical queries always regenerate to the same text.

mod blank_nodes;
mod error;
mod plan;
mod preamble;
mod prepared;

pub use error::QueryError;
pub use plan::{ExecutionPlan, Limits, SplitPlan};
pub use preamble::split_preamble;
pub use prepared::{PreparedQuery, QueryKind};

pub use spargebra;
