//! Ledger-store module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository layer with transactional state transitions

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{AdmissionOutcome, AdmissionRequest, Repository};
