//! External provider capabilities and response handling
//!
//! Outbound calls go through [`HttpCapability`]; email goes through
//! [`EmailSender`]. Both report failures in their return values and never
//! raise, so the dispatcher always produces a uniform result.

pub mod classify;
pub mod email;
pub mod http;
pub mod slack;
pub mod telegram;

pub use classify::{classify_slack, classify_telegram, ProviderOutcome};
pub use email::{EmailMessage, EmailReceipt, EmailSender, RelayEmailSender};
pub use http::{HttpBody, HttpCapability, HttpMethod, HttpReply, HttpRequest, ReqwestHttp, TRANSPORT_FAILURE};
