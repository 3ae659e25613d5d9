//! Distribution editing state machine.
//!
//! # Responsibility
//! - Own the in-memory month/percent rows and lock flags for one budget.
//! - Apply validated transitions and derive total/validity read models.
//!
//! # Invariants
//! - Transitions are total functions: bad input degrades to "unchanged
//!   state", never to a panic or an error.
//! - The lock map always covers exactly the months of the current row set.

pub mod distribution;
pub mod input;
