use crate::known_ids::KnownIds;
use crate::reader::ByteCursor;

use super::scan::decode_lossy;
use super::types::TRAIT_ALIASES;

const MAX_TRAITS: usize = 256;
const MAX_EFFECTS: usize = 512;

/// `count` then `count` length-prefixed strings. Stops at the first entry
/// that does not fit; empty strings are not returned.
fn string_list(payload: &[u8], max: usize) -> Vec<String> {
    let entries = ByteCursor::new(payload).read_array_prefix(max, |c| {
        let len = c.read_len("list entry length")?;
        Ok(decode_lossy(c.read_bytes(len)?))
    });
    entries
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect()
}

fn sorted_unique(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids.dedup();
    ids
}

pub(crate) fn traits(payload: &[u8], known: &KnownIds) -> Vec<String> {
    let ids = string_list(payload, MAX_TRAITS)
        .into_iter()
        .map(|id| {
            TRAIT_ALIASES
                .iter()
                .find(|(alias, _)| *alias == id)
                .map_or(id, |(_, canonical)| (*canonical).to_string())
        })
        .filter(|id| known.is_known_trait(id))
        .collect();
    sorted_unique(ids)
}

pub(crate) fn effects(payload: &[u8], known: &KnownIds) -> Vec<String> {
    let ids = string_list(payload, MAX_EFFECTS)
        .into_iter()
        .filter(|id| known.is_known_effect(id))
        .collect();
    sorted_unique(ids)
}
