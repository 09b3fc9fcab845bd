use std::collections::BTreeMap;

use crate::reader::ByteCursor;

use super::scan::{decode_lossy, fields, payload_string};
use super::types::SkillGroup;

const MAX_APTITUDE_ENTRIES: usize = 128;
const MAX_MASTERY_ENTRIES: usize = 256;
const MAX_RAW_LEVEL: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Resume {
    pub current_role: Option<String>,
    pub aptitudes: BTreeMap<SkillGroup, u8>,
    pub mastered_roles: Vec<String>,
}

pub(crate) fn decode(payload: &[u8]) -> Resume {
    let mut resume = Resume::default();

    for field in fields(payload) {
        match field.key.as_str() {
            "currentRole" if resume.current_role.is_none() => {
                resume.current_role = payload_string(field.payload).filter(|s| !s.is_empty());
            }
            "AptitudeBySkillGroup" if resume.aptitudes.is_empty() => {
                resume.aptitudes = structured_aptitudes(field.payload);
            }
            "MasteryByRoleID" if resume.mastered_roles.is_empty() => {
                resume.mastered_roles = mastered_roles(field.payload);
            }
            _ => {}
        }
    }

    if resume.aptitudes.is_empty() {
        resume.aptitudes = aptitudes_from_text(payload);
    }
    resume
}

fn keep_highest(out: &mut BTreeMap<SkillGroup, u8>, raw_group: &str, level: u32) {
    let Some(group) = SkillGroup::normalize(raw_group) else {
        return;
    };
    let Some(level) = group.checked_level(level) else {
        return;
    };
    out.entry(group)
        .and_modify(|prev| *prev = (*prev).max(level))
        .or_insert(level);
}

/// `count` then `(group string, level)` pairs. A level is an int32 in
/// `0..=10`, else a float32 in the same range rounded, else four bytes of
/// something else that are skipped.
fn structured_aptitudes(payload: &[u8]) -> BTreeMap<SkillGroup, u8> {
    let entries = ByteCursor::new(payload).read_array_prefix(MAX_APTITUDE_ENTRIES, |c| {
        let name_len = c.read_len("skill group length")?;
        let raw_group = decode_lossy(c.read_bytes(name_len)?);
        let level = read_level(c);
        if level.is_none() {
            let skip = c.remaining().min(4);
            c.skip(skip)?;
        }
        Ok((raw_group, level))
    });

    let mut out = BTreeMap::new();
    for (raw_group, level) in entries.unwrap_or_default() {
        if let Some(level) = level {
            keep_highest(&mut out, &raw_group, level);
        }
    }
    out
}

fn read_level(c: &mut ByteCursor<'_>) -> Option<u32> {
    let start = c.position();
    if let Ok(level) = c.read_i32()
        && (0..=MAX_RAW_LEVEL).contains(&level)
    {
        return Some(level as u32);
    }
    c.seek_to(start).ok()?;
    if let Ok(level) = c.read_f32()
        && (0.0..=MAX_RAW_LEVEL as f32).contains(&level)
    {
        return Some(level.round() as u32);
    }
    c.seek_to(start).ok()?;
    None
}

/// Tokens shaped like `Building3` anywhere in the block's text.
fn aptitudes_from_text(payload: &[u8]) -> BTreeMap<SkillGroup, u8> {
    let mut out = BTreeMap::new();
    let text = decode_lossy(payload);
    let words = text.split(|c: char| !(c.is_alphanumeric() || c == '_'));
    for word in words {
        let split = word
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(word.len());
        let (letters, digits) = word.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            continue;
        }
        if let Ok(level) = digits.parse::<u32>() {
            keep_highest(&mut out, letters, level);
        }
    }
    out
}

/// `count` then `(role id string, one-byte flag)` pairs.
fn mastered_roles(payload: &[u8]) -> Vec<String> {
    let entries = ByteCursor::new(payload).read_array_prefix(MAX_MASTERY_ENTRIES, |c| {
        let id_len = c.read_len("role id length")?;
        let role_id = decode_lossy(c.read_bytes(id_len)?);
        Ok((role_id, c.read_bool()?))
    });
    entries
        .unwrap_or_default()
        .into_iter()
        .filter(|(role_id, mastered)| *mastered && !role_id.is_empty())
        .map(|(role_id, _)| role_id)
        .collect()
}
