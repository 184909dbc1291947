#![forbid(unsafe_code)]

//! Domain layer for the characteristics list: record content, owner identifiers,
//! content signatures and the grouping of records that differ only by owner.
//!
//! Nothing in this crate touches storage. The storage crate re-reads state inside
//! its own transactions and calls into these pure functions.

mod content;
mod fields;
mod groups;
mod ids;
mod signature;

pub use content::*;
pub use fields::*;
pub use groups::*;
pub use ids::*;
pub use signature::*;
