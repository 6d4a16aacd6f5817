//! Directory entry value object for LDAP-style directory records.
//!
//! This crate provides [`DirectoryEntry`], a distinguished name plus multi-valued attributes
//! with opt-in case-insensitive attribute lookup, together with the helpers used to populate
//! it from search results and to describe changes to it.

#![deny(missing_docs)]

mod dn;
mod entry;
mod modification;
mod search;

pub use dn::{
    AttributeTypeAndValue, DistinguishedName, DistinguishedNameError, RelativeDistinguishedName,
};
pub use entry::{DirectoryEntry, DirectoryEntryBuilder};
pub use modification::DirectoryModification;
pub use search::entries_from_search;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = directory_core::Result<T>;
