//! Record path expressions and the shared compiled-path cache.
//!
//! A record path addresses zero or one field within a [`Record`]:
//! `/customer/address/city`, `/lines[0]/sku`.
//!
//! [`Record`]: multilookup_shared::Record

mod cache;
mod expression;

pub use cache::PathCache;
pub use expression::{FieldHandle, RecordPath};
