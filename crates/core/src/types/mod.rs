//! Domain types shared by the API, CLI and tests.

pub mod id;
pub mod identity;
pub mod price;
pub mod status;

pub use id::*;
pub use identity::Identity;
pub use price::{CurrencyCode, Money};
pub use status::*;
