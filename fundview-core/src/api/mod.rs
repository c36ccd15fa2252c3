//! Dashboard backend contract and its implementations.

pub mod backend;
pub mod http;
pub mod scripted;
pub mod types;

pub use backend::{unique_tickers, Backend};
pub use http::HttpBackend;
pub use scripted::{RecordedCall, ScriptedBackend};
pub use types::*;
