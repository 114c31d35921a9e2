//! Core types and rules for provider novelties and their reconciliation
//! against booked appointments.
//!
//! This crate has no HTTP or database dependencies. All other crates depend
//! on it.

// Native `async fn` in trait impls; the trait declares the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod appointment;
pub mod availability;
pub mod clock;
pub mod error;
pub mod hours;
pub mod notify;
pub mod novelty;
pub mod overlap;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
