use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::duplicant::SkillGroup;
use crate::header::SaveGameHeader;

pub const SUPPORTED_MAJOR_VERSION: i32 = 7;
pub const DEFAULT_MINOR_VERSION: i32 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// `saveMajorVersion` / `saveMinorVersion` in the header JSON.
    Header,
    /// The major/minor pair that follows `KSAV` in the body.
    KsavBody,
    #[default]
    Assumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGameVersion {
    pub major: i32,
    pub minor: i32,
    pub source: VersionSource,
}

impl Default for SaveGameVersion {
    fn default() -> Self {
        Self {
            major: SUPPORTED_MAJOR_VERSION,
            minor: DEFAULT_MINOR_VERSION,
            source: VersionSource::Assumed,
        }
    }
}

impl fmt::Display for SaveGameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Diagnostics for one zlib segment that inflated successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveBlockInfo {
    pub offset: usize,
    /// Up to the first 10 compressed bytes, lowercase hex.
    pub header_preview: String,
    /// Bytes from `offset` to the end of the file.
    pub compressed_size: usize,
    pub decompressed_size: usize,
    /// CRC32 of the inflated bytes as 8 lowercase hex digits.
    pub crc32: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KsavSummary {
    pub group_count: usize,
    pub total_instances: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveGameMetadata {
    pub blocks: Vec<SaveBlockInfo>,
    pub ksav_summary: KsavSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectGroup {
    pub name: String,
    pub instance_count: u32,
    pub data_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveGameWorld {
    pub width_in_cells: u32,
    pub height_in_cells: u32,
}

impl SaveGameWorld {
    pub fn cell_count(&self) -> u64 {
        if self.width_in_cells > 0 && self.height_in_cells > 0 {
            u64::from(self.width_in_cells) * u64::from(self.height_in_cells)
        } else {
            0
        }
    }
}

/// Fully decoded save. Sections that are not decoded yet stay empty and are
/// reported through the parse warnings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaveGame {
    pub header: SaveGameHeader,
    pub version: SaveGameVersion,
    pub templates: Vec<String>,
    pub world: SaveGameWorld,
    pub settings: JsonMap<String, JsonValue>,
    #[serde(skip)]
    pub sim_data: Vec<u8>,
    pub groups: Vec<ObjectGroup>,
    pub metadata: SaveGameMetadata,
}

impl SaveGame {
    pub fn group(&self, name: &str) -> Option<&ObjectGroup> {
        self.groups.iter().rev().find(|g| g.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub arrival_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    Calories,
    Health,
    Stress,
    Stamina,
    Decor,
    Temperature,
    Breath,
    Bladder,
    ImmuneLevel,
    Toxicity,
    RadiationBalance,
    Morale,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vitals {
    pub calories: Option<f64>,
    pub health: Option<f64>,
    pub stress: Option<f64>,
    pub stamina: Option<f64>,
    pub decor: Option<f64>,
    pub temperature: Option<f64>,
    pub breath: Option<f64>,
    pub bladder: Option<f64>,
    pub immune_level: Option<f64>,
    pub toxicity: Option<f64>,
    pub radiation_balance: Option<f64>,
    pub morale: Option<f64>,
}

impl Vitals {
    pub fn get(&self, field: VitalField) -> Option<f64> {
        match field {
            VitalField::Calories => self.calories,
            VitalField::Health => self.health,
            VitalField::Stress => self.stress,
            VitalField::Stamina => self.stamina,
            VitalField::Decor => self.decor,
            VitalField::Temperature => self.temperature,
            VitalField::Breath => self.breath,
            VitalField::Bladder => self.bladder,
            VitalField::ImmuneLevel => self.immune_level,
            VitalField::Toxicity => self.toxicity,
            VitalField::RadiationBalance => self.radiation_balance,
            VitalField::Morale => self.morale,
        }
    }

    pub fn set(&mut self, field: VitalField, value: f64) {
        let slot = match field {
            VitalField::Calories => &mut self.calories,
            VitalField::Health => &mut self.health,
            VitalField::Stress => &mut self.stress,
            VitalField::Stamina => &mut self.stamina,
            VitalField::Decor => &mut self.decor,
            VitalField::Temperature => &mut self.temperature,
            VitalField::Breath => &mut self.breath,
            VitalField::Bladder => &mut self.bladder,
            VitalField::ImmuneLevel => &mut self.immune_level,
            VitalField::Toxicity => &mut self.toxicity,
            VitalField::RadiationBalance => &mut self.radiation_balance,
            VitalField::Morale => &mut self.morale,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub const NO_ROLE: &str = "NoRole";

/// One colonist, as recovered from a `Minion` instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duplicant {
    pub identity: Identity,
    /// Never empty; `NoRole` when no resume or hat role was recovered.
    pub role: String,
    pub vitals: Vitals,
    pub traits: Vec<String>,
    pub effects: Vec<String>,
    pub aptitudes: BTreeMap<SkillGroup, u8>,
    pub mastered_roles: Vec<String>,
    pub position: Vector3,
}

impl Default for Duplicant {
    fn default() -> Self {
        Self {
            identity: Identity::default(),
            role: NO_ROLE.to_string(),
            vitals: Vitals::default(),
            traits: Vec::new(),
            effects: Vec::new(),
            aptitudes: BTreeMap::new(),
            mastered_roles: Vec::new(),
            position: Vector3::default(),
        }
    }
}

impl Duplicant {
    pub fn has_role(&self) -> bool {
        self.role != NO_ROLE
    }
}
