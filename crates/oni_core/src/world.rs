//! World grid summary.
//!
//! The per-cell simulation grid is not decoded yet, so histograms are empty
//! and the breathable share is unknown. Dimensions are recovered from the
//! header, or failing that from labelled integers in the body.

use std::collections::BTreeMap;

use memchr::memmem;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::duplicant::first_i32_in_range;
use crate::header::non_negative_field;
use crate::model::SaveGameWorld;

pub const GRID_NOT_DECODED: &str =
    "Per-cell world grid is not decoded; histograms are empty placeholders";

const LABEL_WINDOW: usize = 256;
const DIMENSION_RANGE: std::ops::RangeInclusive<i32> = 8..=10_000;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Histograms {
    pub elements: BTreeMap<String, u64>,
    pub temperatures: BTreeMap<String, u64>,
    pub diseases: BTreeMap<String, u64>,
    pub radiation: BTreeMap<String, u64>,
}

impl Histograms {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
            && self.temperatures.is_empty()
            && self.diseases.is_empty()
            && self.radiation.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldGridSummary {
    pub width: u32,
    pub height: u32,
    pub cell_count: u64,
    pub histograms: Histograms,
    pub breathable_percent: Option<f64>,
    pub warnings: Vec<String>,
}

impl WorldGridSummary {
    pub fn build(world: &SaveGameWorld, sim_data: &[u8]) -> Self {
        let cell_count = world.cell_count();
        let histograms = compute_histograms(sim_data, world.width_in_cells, world.height_in_cells);
        let breathable_percent = compute_breathable_percent(&histograms, cell_count);
        Self {
            width: world.width_in_cells,
            height: world.height_in_cells,
            cell_count,
            histograms,
            breathable_percent,
            warnings: vec![GRID_NOT_DECODED.to_string()],
        }
    }
}

pub fn compute_histograms(_sim_data: &[u8], _width: u32, _height: u32) -> Histograms {
    Histograms::default()
}

pub fn compute_breathable_percent(_histograms: &Histograms, _cell_count: u64) -> Option<f64> {
    None
}

/// Width and height in cells from `WidthInCells` / `HeightInCells` (either
/// casing) in the header, else from the first plausible int32 after the same
/// labels in `body`.
pub fn detect_world_dimensions(
    game_info: &JsonMap<String, JsonValue>,
    body: &[u8],
) -> SaveGameWorld {
    let from_header =
        |keys: &[&str]| u32::try_from(non_negative_field(game_info, keys)).unwrap_or(0);
    let mut world = SaveGameWorld {
        width_in_cells: from_header(&["WidthInCells", "widthInCells"]),
        height_in_cells: from_header(&["HeightInCells", "heightInCells"]),
    };
    if world.width_in_cells == 0 {
        world.width_in_cells = int_after_label(body, b"WidthInCells").unwrap_or(0);
    }
    if world.height_in_cells == 0 {
        world.height_in_cells = int_after_label(body, b"HeightInCells").unwrap_or(0);
    }
    world
}

fn int_after_label(body: &[u8], label: &[u8]) -> Option<u32> {
    let at = memmem::find(body, label)?;
    let window = &body[at..body.len().min(at + LABEL_WINDOW)];
    first_i32_in_range(window, label.len(), DIMENSION_RANGE).map(|v| v as u32)
}

/// The `top_n` largest groups by instance count, largest first (ties by
/// name), plus an `other` entry summing the rest when non-zero.
pub fn structures_histogram(counts: &BTreeMap<String, u64>, top_n: usize) -> Vec<(String, u64)> {
    let mut items: Vec<(&String, &u64)> = counts.iter().collect();
    items.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let split = top_n.min(items.len());
    let other: u64 = items[split..].iter().map(|(_, n)| **n).sum();
    let mut out: Vec<(String, u64)> = items[..split]
        .iter()
        .map(|(name, n)| ((*name).clone(), **n))
        .collect();
    if other > 0 {
        out.push(("other".to_string(), other));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::{
        GRID_NOT_DECODED, WorldGridSummary, detect_world_dimensions, structures_histogram,
    };
    use crate::model::SaveGameWorld;

    fn info(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn summary_is_a_stub_with_dimensions() {
        let world = SaveGameWorld {
            width_in_cells: 256,
            height_in_cells: 384,
        };
        let summary = WorldGridSummary::build(&world, &[]);
        assert_eq!(summary.cell_count, 98_304);
        assert!(summary.histograms.is_empty());
        assert_eq!(summary.breathable_percent, None);
        assert_eq!(summary.warnings, vec![GRID_NOT_DECODED]);

        let json = serde_json::to_value(&summary.histograms).expect("serializes");
        let keys: Vec<_> = json.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for key in ["elements", "temperatures", "diseases", "radiation"] {
            assert!(keys.iter().any(|k| k == key));
        }
    }

    #[test]
    fn header_dimensions_win() {
        let world = detect_world_dimensions(
            &info(json!({"WidthInCells": 256, "heightInCells": 384})),
            b"WidthInCells\x40\x00\x00\x00",
        );
        assert_eq!(world.width_in_cells, 256);
        assert_eq!(world.height_in_cells, 384);
    }

    #[test]
    fn body_labels_fill_missing_dimensions() {
        let mut body = b"....WidthInCells".to_vec();
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(&160i32.to_le_bytes());
        body.extend_from_slice(b"HeightInCells");
        body.extend_from_slice(&3i32.to_le_bytes());

        let world = detect_world_dimensions(&info(json!({})), &body);
        assert_eq!(world.width_in_cells, 160);
        assert_eq!(world.height_in_cells, 0);
    }

    #[test]
    fn histogram_keeps_top_groups_and_buckets_the_rest() {
        let counts = BTreeMap::from([
            ("Tile".to_string(), 500),
            ("Door".to_string(), 20),
            ("Ladder".to_string(), 20),
            ("Bed".to_string(), 3),
        ]);
        assert_eq!(
            structures_histogram(&counts, 2),
            vec![("Tile".to_string(), 500), ("Door".to_string(), 20)]
                .into_iter()
                .chain([("other".to_string(), 23)])
                .collect::<Vec<_>>()
        );
        assert_eq!(structures_histogram(&counts, 50).len(), 4);
        assert!(structures_histogram(&BTreeMap::new(), 5).is_empty());
    }
}
