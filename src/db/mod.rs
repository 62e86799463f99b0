//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - `Repository` for pool-level reads
//! - `Session`, the transaction every mutation runs in

pub mod migrations;
pub mod repo;
pub mod session;

pub use migrations::init_db;
pub use repo::Repository;
pub use session::Session;
