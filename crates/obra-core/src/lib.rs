//! Core types, services and the store trait for Obra's quality-audit core.
//!
//! Covers the parts of the construction-quality application that span record
//! types: minting record codes, the per-record history ledger, symmetric
//! relationships between records, the submission workflow and the activity
//! log. Business records themselves are owned elsewhere; this crate only
//! sees `(type, id)` references.
//!
//! This crate is deliberately free of HTTP and database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod codes;
pub mod error;
pub mod graph;
pub mod history;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod record;
pub mod relationship;
pub mod services;
pub mod store;
pub mod submission;

pub use error::{Error, Result};
pub use services::Services;
