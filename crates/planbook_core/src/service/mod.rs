//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Convert every failure into a user-facing notification at the boundary.

pub mod budget_service;
