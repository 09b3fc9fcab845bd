//! Byte-level heuristics shared by the behavior decoders. Every helper is
//! bounded by the slice it is given and reports absence with `None`.

use std::ops::RangeInclusive;

const STRUCTURAL_TOKENS: &[&str] = &["Minion", "MinionIdentity", "MALE", "FEMALE", "NB"];

pub(crate) fn i32_at(buf: &[u8], off: usize) -> Option<i32> {
    Some(i32::from_le_bytes(buf.get(off..off.checked_add(4)?)?.try_into().ok()?))
}

pub(crate) fn i64_at(buf: &[u8], off: usize) -> Option<i64> {
    Some(i64::from_le_bytes(buf.get(off..off.checked_add(8)?)?.try_into().ok()?))
}

pub(crate) fn f32_at(buf: &[u8], off: usize) -> Option<f32> {
    Some(f32::from_le_bytes(buf.get(off..off.checked_add(4)?)?.try_into().ok()?))
}

pub(crate) fn f64_at(buf: &[u8], off: usize) -> Option<f64> {
    Some(f64::from_le_bytes(buf.get(off..off.checked_add(8)?)?.try_into().ok()?))
}

/// Decode UTF-8, dropping invalid sequences instead of replacing them.
pub(crate) fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// An int32-length-prefixed string at `off`, and the offset after it.
pub(crate) fn read_klei_string(buf: &[u8], off: usize) -> Option<(String, usize)> {
    let len = usize::try_from(i32_at(buf, off)?).ok()?;
    let start = off + 4;
    let bytes = buf.get(start..start.checked_add(len)?)?;
    Some((decode_lossy(bytes), start + len))
}

/// A string that fills a length-prefixed payload from its first byte.
pub(crate) fn payload_string(payload: &[u8]) -> Option<String> {
    read_klei_string(payload, 0).map(|(s, _)| s)
}

/// Slide over `buf` collecting up to `max` non-empty length-prefixed strings.
/// An implausible length advances by a single byte.
pub(crate) fn scan_strings(buf: &[u8], max: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut p = 0;
    while p + 4 <= buf.len() && out.len() < max {
        match read_klei_string(buf, p) {
            Some((s, next)) => {
                p = next;
                if !s.is_empty() {
                    out.push(s);
                }
            }
            None => p += 1,
        }
    }
    out
}

/// The value at the highest offset in `buf` that reads as a finite float32
/// inside `range`.
pub(crate) fn last_f32_in_range(buf: &[u8], range: RangeInclusive<f32>) -> Option<f32> {
    (0..buf.len().saturating_sub(3))
        .rev()
        .filter_map(|off| f32_at(buf, off))
        .find(|v| v.is_finite() && range.contains(v))
}

/// The value at the lowest offset in `buf[from..]` that reads as an int32
/// inside `range`.
pub(crate) fn first_i32_in_range(
    buf: &[u8],
    from: usize,
    range: RangeInclusive<i32>,
) -> Option<i32> {
    (from..buf.len().saturating_sub(3))
        .filter_map(|off| i32_at(buf, off))
        .find(|v| range.contains(v))
}

pub(crate) fn is_plausible_name(s: &str) -> bool {
    let len = s.chars().count();
    if !(2..=40).contains(&len) || STRUCTURAL_TOKENS.contains(&s) {
        return false;
    }
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphabetic() || matches!(c, ' ' | '\'' | '-'))
}

/// A `{key string}{int32 len}{payload}` entry inside a behavior block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field<'a> {
    pub key: String,
    pub payload: &'a [u8],
}

/// Walks the key/length/payload entries of a behavior block. Bytes that do
/// not start a readable key are stepped over one at a time; a key whose
/// length is negative or overruns resumes the walk right after that length.
#[derive(Debug, Clone)]
pub(crate) struct Fields<'a> {
    buf: &'a [u8],
    pos: usize,
}

pub(crate) fn fields(buf: &[u8]) -> Fields<'_> {
    Fields { buf, pos: 0 }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.buf.len() {
            let Some((key, after_key)) = read_klei_string(self.buf, self.pos) else {
                self.pos += 1;
                continue;
            };
            let len = i32_at(self.buf, after_key)?;
            let start = after_key + 4;
            let end = usize::try_from(len).ok().and_then(|n| start.checked_add(n));
            match end {
                Some(end) if end <= self.buf.len() => {
                    self.pos = end;
                    return Some(Field {
                        key,
                        payload: &self.buf[start..end],
                    });
                }
                _ => self.pos = start,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_lossy, fields, first_i32_in_range, is_plausible_name, last_f32_in_range,
        read_klei_string, scan_strings,
    };

    fn klei(s: &str) -> Vec<u8> {
        let mut out = (s.len() as i32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn name_filter_rejects_tokens_and_punctuation() {
        assert!(is_plausible_name("Meep"));
        assert!(is_plausible_name("Ren O'Hara-Smith"));
        assert!(!is_plausible_name("A"));
        assert!(!is_plausible_name("MinionIdentity"));
        assert!(!is_plausible_name("FEMALE"));
        assert!(!is_plausible_name("hat_role_mining1"));
        assert!(!is_plausible_name("Klei.AI.Traits"));
        assert!(!is_plausible_name(" Leading"));
        assert!(!is_plausible_name(&"x".repeat(41)));
    }

    #[test]
    fn reads_and_scans_length_prefixed_strings() {
        let mut buf = vec![0xFF, 0xFF];
        buf.extend(klei("Ari"));
        buf.extend(klei(""));
        buf.extend(klei("Bubbles"));

        let (first, next) = read_klei_string(&buf, 2).expect("string at 2");
        assert_eq!(first, "Ari");
        assert_eq!(next, 9);
        assert!(read_klei_string(&buf, 0).is_none());

        assert_eq!(scan_strings(&buf, 32), vec!["Ari", "Bubbles"]);
        assert_eq!(scan_strings(&buf, 1), vec!["Ari"]);
    }

    #[test]
    fn invalid_utf8_is_dropped() {
        assert_eq!(decode_lossy(b"Me\xFFep"), "Meep");
    }

    #[test]
    fn finds_last_float_and_first_int_in_range() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&50.0f32.to_le_bytes());
        buf.extend_from_slice(&f32::NAN.to_le_bytes());
        buf.extend_from_slice(&5000.0f32.to_le_bytes());
        buf.extend_from_slice(&75.5f32.to_le_bytes());
        assert_eq!(last_f32_in_range(&buf, 0.0..=100.0), Some(75.5));
        assert_eq!(last_f32_in_range(&buf, 1000.0..=9000.0), Some(5000.0));
        assert_eq!(last_f32_in_range(&buf[..3], 0.0..=100.0), None);

        let mut ints = vec![0u8; 3];
        ints.extend_from_slice(&256i32.to_le_bytes());
        assert_eq!(first_i32_in_range(&ints, 0, 8..=10_000), Some(256));
        assert_eq!(first_i32_in_range(&ints, 4, 8..=10_000), None);
    }

    #[test]
    fn field_walk_skips_unreadable_bytes() {
        let mut buf = vec![0xFF];
        buf.extend(klei("name"));
        let payload = klei("Meep");
        buf.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        buf.extend_from_slice(&payload);
        buf.extend(klei("broken"));
        buf.extend_from_slice(&(-5i32).to_le_bytes());
        buf.extend(klei("gender"));
        buf.extend_from_slice(&0i32.to_le_bytes());

        let found: Vec<_> = fields(&buf).map(|f| (f.key, f.payload.len())).collect();
        assert_eq!(
            found,
            vec![("name".to_string(), 8), ("gender".to_string(), 0)]
        );
    }
}
