//! Core functionality module
//!
//! This module contains the scan pipeline around the content index:
//! configuration, error handling, tree enumeration, the hand-off queue and
//! the scan orchestration itself.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types and result aliases
//! - `enumerate` - Tree walk with self-exclusion
//! - `events` - Index events and scan reports
//! - `queue` - Buffer between hashing and reconciliation
//! - `scan` - One complete scan run

pub mod config;
pub mod enumerate;
pub mod error;
pub mod events;
pub mod queue;
pub mod scan;
