//! Feature library (Layer 1)
//!
//! Feature CRUD, built-in templates, and BRD matching.

#![warn(missing_docs)]

pub mod service;
pub mod template;
pub mod brd;

pub use service::{
    FeatureLibrary, FeatureFilter, FeatureUpdate, NewFeature, TemplateApplication, LibraryError,
    find_in,
};
pub use template::{TemplateRegistry, TemplateBuilder};
pub use brd::{match_brd, BrdMatch};
