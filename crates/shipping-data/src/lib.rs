//! # shipping-data
//!
//! Specification-driven data access for the shipping back-office.
//!
//! A [`UnitOfWork`] owns one storage connection for the lifetime of a
//! request. It hands out one cached [`GenericRepository`] per entity type,
//! flushes staged writes atomically with [`UnitOfWork::save`], and scopes
//! multi-save writes in a [`Transaction`]. Storage engines live under
//! [`engine`]: a process-local engine for tests and demos, and PostgreSQL.

pub mod connection;
mod context;
pub mod engine;
pub mod repository;
pub mod unit_of_work;

pub use connection::DatabasePool;
pub use engine::{MemoryEngine, PostgresEngine, connect_engine};
pub use repository::GenericRepository;
pub use unit_of_work::{Transaction, TransactionState, UnitOfWork};
