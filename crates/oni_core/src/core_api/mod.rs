mod engine;
mod error;
mod types;

pub use engine::Engine;
pub use error::{CoreError, CoreErrorCode};
pub use types::{Entities, MinorVersionRange, ParseOptions, ParseResult, SupportedVersions};
