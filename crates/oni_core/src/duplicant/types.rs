use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::VitalField;

/// Canonical skill groups a duplicant can have an aptitude in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillGroup {
    Mining,
    Building,
    Farming,
    Ranching,
    Research,
    Cooking,
    Art,
    Hauling,
    Suits,
    Technicals,
    Engineering,
    Basekeeping,
    Management,
    MedicalAid,
}

impl SkillGroup {
    pub const ALL: [SkillGroup; 14] = [
        Self::Mining,
        Self::Building,
        Self::Farming,
        Self::Ranching,
        Self::Research,
        Self::Cooking,
        Self::Art,
        Self::Hauling,
        Self::Suits,
        Self::Technicals,
        Self::Engineering,
        Self::Basekeeping,
        Self::Management,
        Self::MedicalAid,
    ];

    pub fn max_tier(self) -> u8 {
        match self {
            Self::Mining | Self::Building | Self::Farming | Self::Research | Self::Art => 3,
            Self::MedicalAid => 3,
            Self::Ranching | Self::Cooking | Self::Hauling | Self::Technicals => 2,
            Self::Basekeeping | Self::Management => 2,
            Self::Suits | Self::Engineering => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mining => "Mining",
            Self::Building => "Building",
            Self::Farming => "Farming",
            Self::Ranching => "Ranching",
            Self::Research => "Research",
            Self::Cooking => "Cooking",
            Self::Art => "Art",
            Self::Hauling => "Hauling",
            Self::Suits => "Suits",
            Self::Technicals => "Technicals",
            Self::Engineering => "Engineering",
            Self::Basekeeping => "Basekeeping",
            Self::Management => "Management",
            Self::MedicalAid => "MedicalAid",
        }
    }

    /// Map a raw group token from a save onto a canonical group. Tokens that
    /// name a group outside the canonical set (such as `Operating`) map to
    /// `None`.
    pub fn normalize(raw: &str) -> Option<Self> {
        let lower = raw.to_ascii_lowercase();
        if let Some((_, group)) = SKILL_GROUP_ALIASES.iter().find(|(alias, _)| *alias == lower) {
            return Some(*group);
        }
        SKILL_GROUP_PREFIXES
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .and_then(|(_, group)| *group)
    }

    /// `level` when it is a valid tier for this group.
    pub fn checked_level(self, level: u32) -> Option<u8> {
        u8::try_from(level)
            .ok()
            .filter(|l| (1..=self.max_tier()).contains(l))
    }
}

impl fmt::Display for SkillGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[rustfmt::skip]
const SKILL_GROUP_ALIASES: &[(&str, SkillGroup)] = &[
    ("mining",         SkillGroup::Mining),
    ("building",       SkillGroup::Building),
    ("farming",        SkillGroup::Farming),
    ("ranching",       SkillGroup::Ranching),
    ("researching",    SkillGroup::Research),
    ("research",       SkillGroup::Research),
    ("cooking",        SkillGroup::Cooking),
    ("arting",         SkillGroup::Art),
    ("art",            SkillGroup::Art),
    ("hauling",        SkillGroup::Hauling),
    ("suits",          SkillGroup::Suits),
    ("technicals",     SkillGroup::Technicals),
    ("engineering",    SkillGroup::Engineering),
    ("basekeeping",    SkillGroup::Basekeeping),
    ("astronauting",   SkillGroup::Management),
    ("medicine",       SkillGroup::MedicalAid),
    ("rocketpiloting", SkillGroup::Management),
    ("medicalaid",     SkillGroup::MedicalAid),
];

// Checked in order; the first matching prefix decides.
#[rustfmt::skip]
const SKILL_GROUP_PREFIXES: &[(&str, Option<SkillGroup>)] = &[
    ("build",    Some(SkillGroup::Building)),
    ("resear",   Some(SkillGroup::Research)),
    ("resea",    Some(SkillGroup::Research)),
    ("min",      Some(SkillGroup::Mining)),
    ("farm",     Some(SkillGroup::Farming)),
    ("ranch",    Some(SkillGroup::Ranching)),
    ("operat",   None),
    ("engin",    Some(SkillGroup::Engineering)),
    ("medica",   Some(SkillGroup::MedicalAid)),
    ("med",      Some(SkillGroup::MedicalAid)),
    ("cook",     Some(SkillGroup::Cooking)),
    ("art",      Some(SkillGroup::Art)),
    ("haul",     Some(SkillGroup::Hauling)),
    ("tidy",     Some(SkillGroup::Basekeeping)),
    ("suit",     Some(SkillGroup::Suits)),
    ("tech",     Some(SkillGroup::Technicals)),
    ("pyrotech", Some(SkillGroup::Technicals)),
    ("astron",   Some(SkillGroup::Management)),
    ("manage",   Some(SkillGroup::Management)),
];

#[rustfmt::skip]
const HAT_ROLES: &[(&str, &str)] = &[
    ("building",    "Builder"),
    ("mining",      "Miner"),
    ("digging",     "Miner"),
    ("research",    "Researcher"),
    ("cooking",     "Cook"),
    ("cook",        "Cook"),
    ("farming",     "Farmer"),
    ("farmer",      "Farmer"),
    ("ranching",    "Rancher"),
    ("doctor",      "Doctor"),
    ("medical",     "Doctor"),
    ("artist",      "Artist"),
    ("operating",   "Operator"),
    ("operator",    "Operator"),
    ("engineering", "Engineer"),
    ("engineer",    "Engineer"),
    ("hauling",     "Courier"),
    ("supply",      "Courier"),
    ("tidying",     "Sweeper"),
];

#[rustfmt::skip]
const HAT_ROLE_PREFIXES: &[(&str, &str)] = &[
    ("build",    "Builder"),
    ("resear",   "Researcher"),
    ("min",      "Miner"),
    ("farm",     "Farmer"),
    ("ranch",    "Rancher"),
    ("operat",   "Operator"),
    ("engin",    "Engineer"),
    ("med",      "Doctor"),
    ("cook",     "Cook"),
    ("art",      "Artist"),
    ("haul",     "Courier"),
    ("suppl",    "Courier"),
    ("tidy",     "Sweeper"),
    ("pyrotech", "Pyrotechnician"),
];

/// Role name for a lowercase hat group such as `building` or `med`.
pub(crate) fn hat_role_base(group: &str) -> String {
    HAT_ROLES
        .iter()
        .find(|(name, _)| *name == group)
        .or_else(|| HAT_ROLE_PREFIXES.iter().find(|(prefix, _)| group.starts_with(prefix)))
        .map(|(_, role)| (*role).to_string())
        .unwrap_or_else(|| capitalize(group))
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Modifier label, the vital it feeds, and the inclusive range of values
/// accepted for it.
#[rustfmt::skip]
pub(crate) const VITAL_LABELS: &[(&str, VitalField, f32, f32)] = &[
    ("Calories",         VitalField::Calories,           0.0, 1.0e9),
    ("Health",           VitalField::Health,             0.0, 1000.0),
    ("Stress",           VitalField::Stress,             0.0, 100.0),
    ("Stamina",          VitalField::Stamina,            0.0, 100.0),
    ("Decor",            VitalField::Decor,          -1000.0, 1000.0),
    ("Temperature",      VitalField::Temperature,        0.0, 1000.0),
    ("Breath",           VitalField::Breath,             0.0, 100.0),
    ("Bladder",          VitalField::Bladder,            0.0, 100.0),
    ("ImmuneLevel",      VitalField::ImmuneLevel,        0.0, 100.0),
    ("Toxicity",         VitalField::Toxicity,           0.0, 100.0),
    ("RadiationBalance", VitalField::RadiationBalance, -10000.0, 10000.0),
    ("QualityOfLife",    VitalField::Morale,         -1000.0, 1000.0),
];

pub(crate) const TRAIT_ALIASES: &[(&str, &str)] = &[("DiversLung", "DeeperDiversLungs")];

#[cfg(test)]
mod tests {
    use super::{SkillGroup, capitalize, hat_role_base};

    #[test]
    fn normalizes_aliases_prefixes_and_unknowns() {
        assert_eq!(SkillGroup::normalize("Researching"), Some(SkillGroup::Research));
        assert_eq!(SkillGroup::normalize("RocketPiloting"), Some(SkillGroup::Management));
        assert_eq!(SkillGroup::normalize("Medicine"), Some(SkillGroup::MedicalAid));
        assert_eq!(SkillGroup::normalize("MiningSkill"), Some(SkillGroup::Mining));
        assert_eq!(SkillGroup::normalize("TidyUp"), Some(SkillGroup::Basekeeping));
        assert_eq!(SkillGroup::normalize("Pyrotechnics"), Some(SkillGroup::Technicals));
        assert_eq!(SkillGroup::normalize("Operating"), None);
        assert_eq!(SkillGroup::normalize("Brewing"), None);
    }

    #[test]
    fn levels_are_bounded_by_the_group_tier() {
        assert_eq!(SkillGroup::Suits.checked_level(1), Some(1));
        assert_eq!(SkillGroup::Suits.checked_level(2), None);
        assert_eq!(SkillGroup::Mining.checked_level(3), Some(3));
        assert_eq!(SkillGroup::Mining.checked_level(0), None);
        assert_eq!(SkillGroup::Ranching.checked_level(300), None);
        assert!(SkillGroup::ALL.iter().all(|g| (1..=3).contains(&g.max_tier())));
    }

    #[test]
    fn skill_groups_serialize_by_name() {
        let json = serde_json::to_string(&SkillGroup::MedicalAid).expect("serializes");
        assert_eq!(json, "\"MedicalAid\"");
        assert_eq!(SkillGroup::Art.to_string(), "Art");
    }

    #[test]
    fn hat_groups_map_to_role_names() {
        assert_eq!(hat_role_base("digging"), "Miner");
        assert_eq!(hat_role_base("medic"), "Doctor");
        assert_eq!(hat_role_base("pyrotechnic"), "Pyrotechnician");
        assert_eq!(hat_role_base("astronaut"), "Astronaut");
        assert_eq!(capitalize("rOCKET"), "Rocket");
    }
}
