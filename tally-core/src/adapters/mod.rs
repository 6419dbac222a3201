//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB tables for the CollectionStore port
//! - In-memory JSON collections for tests and embedding
//! - comfy-table text pages for the DocumentWriter port
//! - zip-packed XLSX for the SpreadsheetWriter port
//! - Demo record generation

pub mod demo;
pub mod document;
pub mod duckdb;
pub mod memory;
pub mod spreadsheet;
