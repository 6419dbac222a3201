//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. Services depend
//! only on these traits, not on concrete implementations.

mod collection;
mod writer;

pub use collection::{CollectionStore, DateFilter, FindQuery, Record, SortOrder};
pub use writer::{DocumentWriter, SpreadsheetWriter};
