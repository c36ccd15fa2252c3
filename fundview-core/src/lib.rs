//! Fundview Core: the client-side core of the fund dashboard.
//!
//! This crate holds everything the front ends share:
//! - Fetch lifecycle controller with per-slot "last request wins" supersession
//! - Executors that run blocking requests off the owning thread
//! - Dependent selection store (market code → ticker → analysis parameters)
//! - Analysis result cache keyed by market, ticker and sorted parameters
//! - View router with single-level close
//! - Backend contract, HTTP client and a scripted in-memory backend
//! - `Session`, which ties them together for one logged-in user

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod router;
pub mod selection;
pub mod session;
pub mod view;

pub use config::Settings;
pub use error::{ConfigError, ErrorKind, FetchError};
pub use session::{DisplayMode, Payload, Session, SessionEvent};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a request job touches can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Payloads travel back from the pool.
        require_send::<Payload>();
        require_send::<executor::Completion<Payload>>();
        require_send::<FetchError>();
        require_sync::<FetchError>();

        // Backends are shared with every job.
        require_send::<api::HttpBackend>();
        require_sync::<api::HttpBackend>();
        require_send::<api::ScriptedBackend>();
        require_sync::<api::ScriptedBackend>();

        // Request bodies are moved into jobs.
        require_send::<api::SvmRequest>();
        require_send::<api::BetaRequest>();
        require_send::<api::PortfolioBetaRequest>();
        require_send::<cache::CacheKey>();
        require_send::<selection::TickerScope>();

        require_send::<Settings>();
        require_sync::<Settings>();
    }

    /// The backend trait stays object safe so front ends can pick one at runtime.
    #[test]
    fn backend_trait_is_object_safe() {
        let backend: Box<dyn api::Backend> = Box::new(api::ScriptedBackend::demo());
        assert_eq!(backend.name(), "scripted");
        assert_eq!(backend.market_codes(api::Department::Fund).unwrap().len(), 3);
    }
}
