//! Domain layer types and invariants.

pub mod schema;
pub mod slug;
pub mod tree;
