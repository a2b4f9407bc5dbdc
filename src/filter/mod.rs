//! Subscription filters.
//!
//! A filter is a conjunction of `field <op> literal` clauses, parsed and
//! validated once at subscribe time and then evaluated for every publish:
//!
//! ```ignore
//! let filter = Predicate::parse(&wire)?;    // {count: {gt: 3}}
//! if matches(&filter, &document) { ... }
//! ```

mod matcher;
mod predicate;

pub use matcher::{compare_values, matches, resolve_path, values_equal};
pub use predicate::{Clause, CompareOp, Predicate};
