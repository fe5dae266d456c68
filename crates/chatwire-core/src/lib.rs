//! ChatWire Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout ChatWire:
//! - Normalized request inputs and stream events
//! - The provider adapter trait
//! - The response-shape extraction fallback chain
//! - Title fetch diagnostics and the title-trigger decision
//! - Core error types

pub mod adapter;
pub mod error;
pub mod events;
pub mod extract;
pub mod request;
pub mod title;
pub mod title_trigger;

pub use error::{Error, Result};
