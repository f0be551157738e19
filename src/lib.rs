//! Sink BOM Library
//!
//! Resolves configured sink builds into hierarchical and aggregated bills of
//! materials against a preloaded part/assembly catalog.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod bom;
pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod models;
pub mod rules;
pub mod services;

pub use bom::{generate_bom, generate_order_bom, CategoryPriority, RootSelection};
pub use catalog::{CatalogSnapshot, CatalogSource, CatalogStore, StaticCatalogSource};
pub use errors::{BomError, ErrorCategory, ErrorResponse, ServiceError};
pub use rules::RuleTables;
pub use services::{BomGenerationService, ConfigurationStore};
