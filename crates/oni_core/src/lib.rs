//! Decoder for Oxygen Not Included colony saves.
//!
//! [`core_api::Engine`] is the entry point; the other modules are the
//! individual decode stages and can be used on their own.

pub mod compressed;
pub mod context;
pub mod core_api;
pub mod duplicant;
pub mod header;
pub mod known_ids;
pub mod ksav;
pub mod metadata;
pub mod model;
pub mod reader;
pub mod world;
