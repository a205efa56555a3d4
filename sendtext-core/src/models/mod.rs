//! Data models for sendtext

pub mod configuration;
pub mod request;
pub mod result;

pub use configuration::*;
pub use request::*;
pub use result::*;
