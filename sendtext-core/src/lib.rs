//! # sendtext core library
//!
//! Delivers text through email, Slack or Telegram, normalizing every provider
//! response into a uniform result. Provider-discovered identity (Telegram bot
//! and chat) is cached per dispatcher to avoid redundant lookups.

pub mod channel;
pub mod dispatch;
pub mod models;
pub mod providers;
pub mod server;
pub mod services;
pub mod storage;

pub use dispatch::Dispatcher;
pub use models::{ChannelKind, Configuration, DispatchResult, DispatchStatus, RequestInputs};
