//! Engine of the console access layer.
//!
//! * [`http::Transport`] wraps `reqwest` with bounded retries, per-family
//!   timeouts and a [`http::Monitor`].
//! * [`client::ResourceClient`] performs paginated CRUD against namespaced
//!   control-plane resources and classifies failures into domain errors.
//! * [`translate`] converts backend JSON to console entities and back.
//! * [`token::DelegatedTokenCache`] resolves receiver-scoped tokens through a
//!   [`token::CredentialSource`].

pub mod cache;
pub mod client;
pub mod config;
pub mod http;
pub mod telemetry;
pub mod token;
pub mod translate;

pub use cache::{CacheStore, MemoryCacheStore, TtlCache, cache_key};
pub use client::{ListQuery, ResourceClient, Status};
pub use config::{CoreConfig, ReceiverCredential};
pub use http::{
    CallFamily, Monitor, Observation, RetryPolicy, TimeoutPolicy, TracingMonitor, Transport,
};
pub use token::{
    CredentialSource, DelegatedToken, DelegatedTokenCache, Receiver, StaticCredentials,
    TokenExchanger,
};
