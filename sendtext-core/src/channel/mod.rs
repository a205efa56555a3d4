//! Request channel resolution

pub mod resolver;

pub use resolver::{extract_addresses, resolve, PLACEHOLDER_TEXT};
