//! Planbe Core - Domain types and checkout rules.
//!
//! This crate provides the types and business rules shared by the Planbe
//! components:
//! - `server` - JSON API consumed by the web client
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O, no
//! database access, no SMTP. Collaborators (catalog lookups, persistence,
//! notification delivery) are injected by the caller.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, prices and order states
//! - [`catalog`] - Products and the [`Catalog`] lookup trait
//! - [`basket`] - Basket bookkeeping and line-item aggregation
//! - [`order`] - Orders, delivery details and the finalize transition
//! - [`error`] - [`CoreError`] kinds surfaced to callers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod basket;
pub mod catalog;
pub mod error;
pub mod order;
pub mod types;

pub use basket::{Basket, LineItem, aggregate};
pub use catalog::{Catalog, Product};
pub use error::CoreError;
pub use order::{
    DeliveryDetails, Finalized, NewOrder, Order, OrderConfirmation, Recipient, finalize,
};
pub use types::*;
