//! Domain models for the catalog, cart and order tables.

pub mod account;
pub mod cart;
pub mod order;
pub mod product;

pub use account::{Account, NewAccount};
pub use cart::{CartEntry, CartLine};
pub use order::{
    NewOrder, NewOrderItem, NewPayment, Order, OrderDetail, OrderItem, OrderSummary, Payment,
};
pub use product::{Category, Product, ProductFields, ProductQuery, ProductView};
