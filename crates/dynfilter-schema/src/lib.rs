//! Schema declarations for the dynfilter query compiler.
//!
//! This crate describes the shape of the models a host ORM exposes: their
//! fields, native column types, enum choices, relations and the optional
//! per-field `filter_config` override. The compiler in the `dynfilter` crate
//! only ever reads these types.
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use dynfilter_schema::prelude::*;
//!
//! let product = Schema::new("product")
//!     .with_field(FieldDef::new("name", NativeType::Char).with_filter_config(
//!         FieldFilterConfig::default().searchable(true),
//!     ))
//!     .with_field(FieldDef::new("price", NativeType::Integer));
//!
//! let catalog = Catalog::new(vec![product]);
//! assert!(catalog.get("product").is_some());
//! ```

pub mod catalog;
pub mod error;
pub mod field;
pub mod prelude;
