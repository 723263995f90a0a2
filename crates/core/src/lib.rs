//! Bika Core - catalog access rules, stock arithmetic and checkout planning.
//!
//! Used by:
//! - `api` - the HTTP service and its stores
//! - `cli` - migrations and account bootstrap
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O. Stores read and lock rows, hand the
//! snapshots to these functions, and persist whatever they return. That keeps
//! the rules identical for the Postgres and in-memory stores.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, statuses and the caller [`Identity`]
//! - [`policy`] - Who may see, browse, buy and mutate a product
//! - [`inventory`] - The stock adjustment primitive
//! - [`checkout`] - Cart validation and order planning
//! - [`naming`] - Slugs, SKUs and order numbers
//! - [`error`] - [`CommerceError`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod error;
pub mod inventory;
pub mod naming;
pub mod policy;
pub mod types;

pub use error::CommerceError;
pub use types::*;
