//! Pure conversions between backend resource JSON and console entities.
//!
//! Single-object translators return `None` when the input is not an object
//! or lacks an identity. List translators only return `None` when the whole
//! payload is malformed; elements that fail are dropped and logged.

pub mod application;
pub mod build;
pub mod config_map;
pub mod env;
pub mod job;
pub mod meta;
pub mod project;
pub mod secret;

pub use env::BackendEnv;
pub use meta::{translate_items, translate_page};
