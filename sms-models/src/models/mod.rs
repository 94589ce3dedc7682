//! Entity model definitions.

pub mod message;
pub mod filter;
