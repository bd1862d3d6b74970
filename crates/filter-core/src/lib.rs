//! Core abstractions for the gateway filter extension runtime.
//!
//! This crate provides the shared vocabulary:
//! - `Action` / `Direction` - Per-signal results and traffic direction
//! - `ContextValue` - Typed values for per-exchange storage and attributes
//! - `RequestMetadata` - Request facts used for configuration matching
//! - `ExchangeState` - Exchange lifecycle tracking
//! - Error types shared across crates

mod action;
mod error;
mod lifecycle;
mod request;
mod value;

pub use action::*;
pub use error::*;
pub use lifecycle::*;
pub use request::*;
pub use value::*;
