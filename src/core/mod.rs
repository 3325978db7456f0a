//! Core business logic - framework-agnostic inventory operations.
//!
//! Pure derivations (status, stats, filters, reports) work on plain slices of models;
//! procedures that write (products, sales, bulk edits, migration, import) take a
//! [`DocumentStore`](crate::store::DocumentStore) and commit through its batches.

pub mod backup;
pub mod bulk;
pub mod catalog;
pub mod dashboard;
pub mod filter;
pub mod migration;
pub mod product;
pub mod report;
pub mod sale;
pub mod stats;
pub mod status;
