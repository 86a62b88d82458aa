//! Data models for the gallery manifest and site config documents.
//!
//! Field names match the JSON documents the static front end reads.

mod manifest;
mod photo;
mod site;
mod tag;

pub use manifest::*;
pub use photo::*;
pub use site::*;
pub use tag::*;
