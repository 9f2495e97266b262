//! Domain layer: entry metadata, path handling, and domain errors

pub mod entry;
pub mod errors;
pub mod path;
