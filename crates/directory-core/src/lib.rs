//! # directory-core
//!
//! Core types shared by the directory entry crates.
//!
//! This crate provides the error type used across the workspace together with the attribute
//! name folding and attribute value decoding rules that every directory entry relies on.
//!
//! ## Modules
//!
//! - [`error`] - Error types and stable error codes
//! - [`attribute`] - Attribute name case folding and value decoding helpers

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute;
pub mod error;

// Re-export commonly used types
pub use attribute::{fold_case, AttributeMap, AttributeValues};
pub use error::{Error, Result};
