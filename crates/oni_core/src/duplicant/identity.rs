use crate::model::Identity;

use super::scan::{
    f32_at, f64_at, fields, i32_at, i64_at, is_plausible_name, payload_string, scan_strings,
};

const NAME_SCAN_LIMIT: usize = 32;
const GENDERS: [&str; 3] = ["MALE", "FEMALE", "NB"];
const FIELD_KEYS: [&str; 5] = [
    "name",
    "nameStringKey",
    "gender",
    "genderStringKey",
    "arrivalTime",
];

/// Decode a `MinionIdentity` payload. The first plausible value of each key
/// wins; a missing name falls back to a scan of the whole block.
pub(crate) fn decode(payload: &[u8]) -> Identity {
    let mut identity = Identity::default();
    let mut arrival = None;

    for field in fields(payload) {
        match field.key.as_str() {
            "name" if identity.name.is_none() => {
                identity.name = payload_string(field.payload).filter(|s| is_plausible_name(s));
            }
            "gender" if identity.gender.is_none() => {
                identity.gender = payload_string(field.payload)
                    .filter(|s| GENDERS.contains(&s.as_str()));
            }
            "arrivalTime" if arrival.is_none() => arrival = arrival_time(field.payload),
            _ => {}
        }
    }

    if identity.name.is_none() {
        identity.name = scan_strings(payload, NAME_SCAN_LIMIT)
            .into_iter()
            .find(|s| is_plausible_name(s) && !FIELD_KEYS.contains(&s.as_str()));
    }
    identity.arrival_time = arrival.unwrap_or(0);
    identity
}

/// First non-negative bounded reading of the payload as int32, int64,
/// float32, then float64.
fn arrival_time(payload: &[u8]) -> Option<u64> {
    const I32_LIMIT: i64 = 10_000_000_000;
    const I64_LIMIT: i64 = 1_000_000_000_000;

    if let Some(v) = i32_at(payload, 0).map(i64::from)
        && (0..I32_LIMIT).contains(&v)
    {
        return Some(v as u64);
    }
    if let Some(v) = i64_at(payload, 0)
        && (0..I64_LIMIT).contains(&v)
    {
        return Some(v as u64);
    }
    if let Some(v) = f32_at(payload, 0).map(f64::from)
        && (0.0..I32_LIMIT as f64).contains(&v)
    {
        return Some(v as u64);
    }
    f64_at(payload, 0)
        .filter(|v| (0.0..I64_LIMIT as f64).contains(v))
        .map(|v| v as u64)
}

#[cfg(test)]
mod tests {
    use super::{arrival_time, decode};

    fn klei(s: &str) -> Vec<u8> {
        let mut out = (s.len() as i32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    fn field(key: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = klei(key);
        out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn decodes_structured_fields() {
        let mut block = field("name", &klei("Meep"));
        block.extend(field("gender", &klei("MALE")));
        block.extend(field("arrivalTime", &42i32.to_le_bytes()));

        let identity = decode(&block);
        assert_eq!(identity.name.as_deref(), Some("Meep"));
        assert_eq!(identity.gender.as_deref(), Some("MALE"));
        assert_eq!(identity.arrival_time, 42);
    }

    #[test]
    fn rejects_placeholder_names_and_unknown_genders() {
        let mut block = field("name", &klei("MinionIdentity"));
        block.extend(field("gender", &klei("ROBOT")));
        let identity = decode(&block);
        assert_eq!(identity.name, None);
        assert_eq!(identity.gender, None);
        assert_eq!(identity.arrival_time, 0);
    }

    #[test]
    fn falls_back_to_string_scan_for_name() {
        let mut block = vec![0x01, 0x02];
        block.extend(klei("MinionIdentity"));
        block.extend(klei("Stinky"));
        let identity = decode(&block);
        assert_eq!(identity.name.as_deref(), Some("Stinky"));
    }

    #[test]
    fn arrival_time_tries_each_width() {
        assert_eq!(arrival_time(&7i32.to_le_bytes()), Some(7));

        let mut wide = (-1i32).to_le_bytes().to_vec();
        wide.extend_from_slice(&[0; 4]);
        assert_eq!(arrival_time(&wide), Some(u64::from(u32::MAX)));

        assert_eq!(arrival_time(&(-3.0f32).to_le_bytes()), None);
        assert_eq!(arrival_time(&[1, 2]), None);
    }
}
