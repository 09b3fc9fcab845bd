use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::reader::{ByteCursor, ReadError};

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("save header is truncated: {0}")]
    Truncated(#[from] ReadError),

    #[error("header JSON is not valid UTF-8")]
    InvalidUtf8,

    #[error("header JSON is malformed: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("header JSON must be an object, found {0}")]
    NotAnObject(&'static str),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaveGameHeader {
    pub build_version: u32,
    pub header_version: u32,
    pub is_compressed: bool,
    pub game_info: JsonMap<String, JsonValue>,
    pub cluster_id: String,
    pub num_cycles: u64,
    pub num_duplicants: u64,
    pub has_dlc: bool,
    pub dlc_ids: Vec<String>,
    pub has_mods: bool,
}

impl SaveGameHeader {
    pub fn parse(r: &mut ByteCursor<'_>) -> Result<Self, HeaderError> {
        let build_version = r.read_u32()?;
        let header_size = r.read_u32()?;
        let header_version = r.read_u32()?;

        let is_compressed = if header_version >= 1 {
            r.read_u32()? != 0
        } else {
            false
        };

        let info_bytes = r.read_bytes(header_size as usize)?;
        let info = std::str::from_utf8(info_bytes).map_err(|_| HeaderError::InvalidUtf8)?;
        let mut game_info = match serde_json::from_str::<JsonValue>(info)? {
            JsonValue::Object(map) => map,
            other => return Err(HeaderError::NotAnObject(json_kind(&other))),
        };

        let cluster_id = first_truthy(&game_info, &["clusterId", "ClusterId"])
            .map(json_to_plain_string)
            .unwrap_or_default();
        let num_cycles = non_negative_field(&game_info, &["numberOfCycles", "cycles"]);
        let num_duplicants = non_negative_field(&game_info, &["numberOfDuplicants", "duplicants"]);

        let dlc_ids = match first_truthy(&game_info, &["dlcIds", "DlcIds"]) {
            Some(JsonValue::String(s)) => vec![s.clone()],
            Some(JsonValue::Array(items)) => items.iter().map(json_to_plain_string).collect(),
            _ => Vec::new(),
        };
        let has_dlc_flag = first_truthy(
            &game_info,
            &["hasDlc", "hasDLc", "hasDLC", "enableDlc", "expansionEnabled"],
        )
        .is_some();
        let has_dlc = has_dlc_flag || !dlc_ids.is_empty();

        let has_mods = matches!(
            first_truthy(&game_info, &["mods", "Mods", "enabledMods"]),
            Some(JsonValue::Array(_) | JsonValue::Object(_))
        );

        game_info.insert("buildVersion".to_string(), build_version.into());
        game_info.insert("headerVersion".to_string(), header_version.into());
        game_info.insert("isCompressed".to_string(), is_compressed.into());

        Ok(Self {
            build_version,
            header_version,
            is_compressed,
            game_info,
            cluster_id,
            num_cycles,
            num_duplicants,
            has_dlc,
            dlc_ids,
            has_mods,
        })
    }

    pub fn base_name(&self) -> &str {
        self.game_info
            .get("baseName")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
    }

    /// `(saveMajorVersion, saveMinorVersion)` if the header carries them.
    pub fn declared_version(&self) -> (Option<i32>, Option<i32>) {
        let read = |key: &str| {
            self.game_info
                .get(key)
                .and_then(JsonValue::as_i64)
                .and_then(|v| i32::try_from(v).ok())
        };
        (read("saveMajorVersion"), read("saveMinorVersion"))
    }
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

/// The first of `keys` whose value is truthy: the header writer is not
/// consistent about key casing across game builds.
fn first_truthy<'a>(map: &'a JsonMap<String, JsonValue>, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| is_truthy(value))
}

/// First truthy value among `keys` read as a non-negative integer, else 0.
pub(crate) fn non_negative_field(map: &JsonMap<String, JsonValue>, keys: &[&str]) -> u64 {
    non_negative(first_truthy(map, keys))
}

fn non_negative(value: Option<&JsonValue>) -> u64 {
    let parsed = match value {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok(),
        Some(JsonValue::Bool(b)) => Some(i64::from(*b)),
        _ => None,
    };
    parsed.filter(|v| *v >= 0).map_or(0, |v| v as u64)
}

fn json_to_plain_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{HeaderError, SaveGameHeader};
    use crate::reader::ByteCursor;

    fn header_bytes(json: &str, header_version: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&612_345u32.to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&header_version.to_le_bytes());
        if header_version >= 1 {
            out.extend_from_slice(&1u32.to_le_bytes());
        }
        out.extend_from_slice(json.as_bytes());
        out
    }

    fn parse(json: &str) -> SaveGameHeader {
        let bytes = header_bytes(json, 1);
        SaveGameHeader::parse(&mut ByteCursor::new(&bytes)).expect("header should parse")
    }

    #[test]
    fn decodes_core_fields() {
        let bytes = header_bytes(
            r#"{"baseName":"Test","numberOfCycles":5,"numberOfDuplicants":2,"clusterId":"c1"}"#,
            1,
        );
        let mut cursor = ByteCursor::new(&bytes);
        let header = SaveGameHeader::parse(&mut cursor).expect("header should parse");

        assert_eq!(header.num_cycles, 5);
        assert_eq!(header.num_duplicants, 2);
        assert_eq!(header.cluster_id, "c1");
        assert_eq!(header.base_name(), "Test");
        assert_eq!(header.build_version, 612_345);
        assert!(header.is_compressed);
        assert_eq!(cursor.position(), bytes.len());
        assert_eq!(header.game_info["headerVersion"], 1);
        assert_eq!(header.game_info["isCompressed"], true);
    }

    #[test]
    fn version_zero_headers_have_no_compression_flag() {
        let bytes = header_bytes(r#"{"numberOfCycles":3}"#, 0);
        let header =
            SaveGameHeader::parse(&mut ByteCursor::new(&bytes)).expect("header should parse");
        assert_eq!(header.num_cycles, 3);
        assert!(!header.is_compressed);
    }

    #[test]
    fn missing_and_invalid_counts_default_to_zero() {
        let header = parse(r#"{"numberOfCycles":-4,"numberOfDuplicants":"lots"}"#);
        assert_eq!(header.num_cycles, 0);
        assert_eq!(header.num_duplicants, 0);
        assert_eq!(header.cluster_id, "");
        assert!(!header.has_dlc);
        assert!(!header.has_mods);
        assert!(header.dlc_ids.is_empty());
    }

    #[test]
    fn counts_accept_alternate_keys_and_number_forms() {
        let header = parse(r#"{"cycles":12.7,"duplicants":"9","ClusterId":"SNDST-A"}"#);
        assert_eq!(header.num_cycles, 12);
        assert_eq!(header.num_duplicants, 9);
        assert_eq!(header.cluster_id, "SNDST-A");
    }

    #[test]
    fn dlc_ids_normalize_to_string_lists() {
        let single = parse(r#"{"dlcIds":"EXPANSION1_ID"}"#);
        assert_eq!(single.dlc_ids, vec!["EXPANSION1_ID"]);
        assert!(single.has_dlc);

        let list = parse(r#"{"DlcIds":["EXPANSION1_ID", 2]}"#);
        assert_eq!(list.dlc_ids, vec!["EXPANSION1_ID", "2"]);

        let flagged = parse(r#"{"dlcIds":{"a":1},"expansionEnabled":true}"#);
        assert!(flagged.dlc_ids.is_empty());
        assert!(flagged.has_dlc);
    }

    #[test]
    fn mods_must_be_a_non_empty_collection() {
        assert!(parse(r#"{"mods":["a"]}"#).has_mods);
        assert!(parse(r#"{"enabledMods":{"x":true}}"#).has_mods);
        assert!(!parse(r#"{"mods":[]}"#).has_mods);
        assert!(!parse(r#"{"mods":"yes"}"#).has_mods);
    }

    #[test]
    fn declared_version_reads_integer_fields() {
        let header = parse(r#"{"saveMajorVersion":7,"saveMinorVersion":35}"#);
        assert_eq!(header.declared_version(), (Some(7), Some(35)));
        assert_eq!(parse("{}").declared_version(), (None, None));
    }

    #[test]
    fn malformed_headers_are_errors() {
        let bad_json = header_bytes("{not json", 1);
        assert!(matches!(
            SaveGameHeader::parse(&mut ByteCursor::new(&bad_json)),
            Err(HeaderError::InvalidJson(_))
        ));

        let not_object = header_bytes("[1,2]", 1);
        assert!(matches!(
            SaveGameHeader::parse(&mut ByteCursor::new(&not_object)),
            Err(HeaderError::NotAnObject("an array"))
        ));

        let mut truncated = header_bytes(r#"{"numberOfCycles":1}"#, 1);
        truncated.truncate(20);
        assert!(matches!(
            SaveGameHeader::parse(&mut ByteCursor::new(&truncated)),
            Err(HeaderError::Truncated(_))
        ));

        assert!(SaveGameHeader::parse(&mut ByteCursor::new(&[0u8; 6])).is_err());

        let mut bad_utf8 = header_bytes("{} ", 1);
        let last = bad_utf8.len() - 1;
        bad_utf8[last] = 0xFF;
        assert!(matches!(
            SaveGameHeader::parse(&mut ByteCursor::new(&bad_utf8)),
            Err(HeaderError::InvalidUtf8)
        ));
    }
}
