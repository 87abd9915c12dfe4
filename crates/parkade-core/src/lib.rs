//! Core types, ledger traits and the cycle engine for the Parkade facility
//! model.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! resolver and projector are generic over the synchronous [`ledger`] traits;
//! storage backends implement those traits and expose the async
//! [`store::ParkingStore`] facade to higher layers.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod clock;
pub mod error;
pub mod event;
pub mod intake;
pub mod ledger;
pub mod memory;
pub mod policy;
pub mod projector;
pub mod resolver;
pub mod spot;
pub mod store;
pub mod traffic;

pub use error::{Classify, Error, ErrorClass, Result};
