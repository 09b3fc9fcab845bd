use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::known_ids::KnownIds;
use crate::model::{DEFAULT_MINOR_VERSION, Duplicant, SaveGame};
use crate::world::WorldGridSummary;

use super::error::CoreError;

pub const MIN_SUPPORTED_MINOR_VERSION: i32 = 11;

/// Decoded object-level data that sits beside the [`SaveGame`] model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entities {
    pub duplicants: Vec<Duplicant>,
    pub object_group_counts: BTreeMap<String, u64>,
    pub world_grid_summary: WorldGridSummary,
}

/// Outcome of one parse call. `save_game` is present iff `success`.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub success: bool,
    pub save_game: Option<SaveGame>,
    pub error: Option<CoreError>,
    pub warnings: Vec<String>,
    pub parse_time: Duration,
    pub entities: Entities,
}

impl ParseResult {
    pub(crate) fn failure(error: CoreError, warnings: Vec<String>, parse_time: Duration) -> Self {
        Self {
            success: false,
            save_game: None,
            error: Some(error),
            warnings,
            parse_time,
            entities: Entities::default(),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Allow-lists for traits and effects; the shared embedded set when unset.
    pub known_ids: Option<Arc<KnownIds>>,
    /// Minor versions accepted without a warning.
    pub minor_version_range: RangeInclusive<i32>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            known_ids: None,
            minor_version_range: MIN_SUPPORTED_MINOR_VERSION..=DEFAULT_MINOR_VERSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinorVersionRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedVersions {
    pub major_version: i32,
    pub minor_version_range: MinorVersionRange,
}
