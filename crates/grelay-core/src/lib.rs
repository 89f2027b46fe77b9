//! Core of the group relay bot: alias registry, admin gate, per-operator
//! routing state, command dispatch and the relay engine.
//!
//! This crate is framework-agnostic. The messaging platform lives behind
//! [`messaging::port::RelayTransport`], implemented in adapter crates.

pub mod audit;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod registry;
pub mod relay;
pub mod security;
pub mod session;

pub use errors::{DeliveryError, Error, Result};
