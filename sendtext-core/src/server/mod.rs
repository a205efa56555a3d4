pub mod api;
pub mod core;

pub use self::core::SendTextServer;
