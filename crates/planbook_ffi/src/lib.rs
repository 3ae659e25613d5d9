//! FFI surface for PlanBook UI hosts.
//!
//! # Responsibility
//! - Re-export the use-case API consumed by the UI layer through FRB.

pub mod api;
