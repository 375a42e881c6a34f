//! Traits that a storage backend must implement to power the checkout engine.
//!
//! The split mirrors the two halves of the core: [`CatalogManagement`] is read-only resolution (variants, offers,
//! delivery zones, coupon history, advisory stock checks), while [`CheckoutDatabase`] holds the transactional
//! operations that mutate order and stock state. Concrete backends (currently SQLite) implement both.

mod catalog_management;
mod checkout_database;

pub use catalog_management::CatalogManagement;
pub use checkout_database::{CheckoutDatabase, CheckoutError};
