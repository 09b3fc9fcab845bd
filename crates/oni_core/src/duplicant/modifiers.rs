use crate::model::Vitals;

use super::scan::{fields, last_f32_in_range};
use super::types::VITAL_LABELS;

/// Fold the amounts in a `MinionModifiers` block into `vitals`. For each
/// labelled entry the last float in the vital's range wins.
pub(crate) fn apply(payload: &[u8], vitals: &mut Vitals) {
    for field in fields(payload) {
        let Some((_, vital, min, max)) = VITAL_LABELS
            .iter()
            .find(|(label, ..)| *label == field.key)
        else {
            continue;
        };
        if let Some(value) = last_f32_in_range(field.payload, *min..=*max) {
            vitals.set(*vital, f64::from(value));
        }
    }
}
