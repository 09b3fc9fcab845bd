//! Allow-lists of trait and effect identifiers.
//!
//! Behavior payloads carry plenty of strings that look like ids but are not.
//! Only identifiers present in these lists are surfaced on a duplicant.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

#[rustfmt::skip]
const EMBEDDED_TRAIT_IDS: &[&str] = &[
    // Negative
    "SmallBladder", "Narcolepsy", "Flatulence", "Anemic", "MouthBreather",
    "BingeEater", "StressVomiter", "UglyCrier", "SlowLearner", "NoodleArms",
    "WeakImmuneSystem", "Snorer", "Allergies", "Hemophobia", "Claustrophobic",
    "SolitarySleeper", "Aggressive", "Uncultured",

    // Positive
    "EarlyBird", "NightOwl", "FastLearner", "StrongArm", "IronGut",
    "StrongImmuneSystem", "DeeperDiversLungs", "InteriorDecorator", "Foodie",
    "SimpleTastes", "Greasemonkey", "MoleHands", "Twinkletoes",
    "SunnyDisposition", "RockCrusher", "BedsideManner", "Archaeologist",
    "Workaholic",

    // Joy reactions
    "BalloonArtist", "SparkleStreaker", "StickerBomber",
];

#[rustfmt::skip]
const EMBEDDED_EFFECT_IDS: &[&str] = &[
    // Sleep
    "UncomfortableSleep", "Sleep", "NarcolepticSleep", "RestfulSleep", "DisturbedSleep",

    // Morale
    "AnewHope", "Mourning", "NewCrewArrival", "CenterOfAttention", "MentalBreak",

    // Body
    "UnderWater", "FullBladder", "StressfulyEmptyingBladder", "WellFed", "StaleFood",
    "SmelledPutridOdour", "Vomiting", "DirtyHands", "Unclean", "SoreBack",
    "SteppedInContaminatedWater",

    // Injury
    "LightWounds", "ModerateWounds", "SevereWounds", "WasAttacked",

    // Environment
    "RedAlert", "CoolingDown", "WarmingUp", "Darkness", "WarmAir", "ColdAir",
    "Hypothermia", "Hyperthermia",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Trait,
    Effect,
}

impl IdKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Trait => "trait",
            Self::Effect => "effect",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KnownIdError {
    #[error("failed to read {what} id list {file}: {source}", what = .kind.label(), file = .path.display())]
    Io {
        kind: IdKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Supplies the raw identifier list for one kind of id.
pub trait KnownIdSource {
    fn load(&self, kind: IdKind) -> Result<Vec<String>, KnownIdError>;
}

/// The identifier sets compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedIds;

impl KnownIdSource for EmbeddedIds {
    fn load(&self, kind: IdKind) -> Result<Vec<String>, KnownIdError> {
        let ids = match kind {
            IdKind::Trait => EMBEDDED_TRAIT_IDS,
            IdKind::Effect => EMBEDDED_EFFECT_IDS,
        };
        Ok(ids.iter().map(|id| (*id).to_string()).collect())
    }
}

/// Identifier lists read from text files. A kind without a path loads as
/// empty, which falls back to the embedded set.
#[derive(Debug, Clone, Default)]
pub struct FileIds {
    traits: Option<PathBuf>,
    effects: Option<PathBuf>,
}

impl FileIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_traits(mut self, path: impl Into<PathBuf>) -> Self {
        self.traits = Some(path.into());
        self
    }

    pub fn with_effects(mut self, path: impl Into<PathBuf>) -> Self {
        self.effects = Some(path.into());
        self
    }

    fn path(&self, kind: IdKind) -> Option<&Path> {
        match kind {
            IdKind::Trait => self.traits.as_deref(),
            IdKind::Effect => self.effects.as_deref(),
        }
    }
}

impl KnownIdSource for FileIds {
    fn load(&self, kind: IdKind) -> Result<Vec<String>, KnownIdError> {
        let Some(path) = self.path(kind) else {
            return Ok(Vec::new());
        };
        let text = fs::read_to_string(path).map_err(|source| KnownIdError::Io {
            kind,
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parse_id_list(&text))
    }
}

/// Parse an id list in either of two layouts: the quoted entries of the first
/// `[ ... ]` array literal (as found in source files), or one id per line.
/// `#` starts a comment in both layouts.
pub fn parse_id_list(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .collect();
    let code = lines.join("\n");
    if let Some(open) = code.find('[')
        && let Some(len) = code[open..].find(']')
    {
        return quoted_entries(&code[open + 1..open + len]);
    }
    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn quoted_entries(inner: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = inner;
    while let Some(start) = rest.find(['"', '\'']) {
        let quote = rest[start..].chars().next().unwrap_or('"');
        let after = &rest[start + 1..];
        let Some(end) = after.find(quote) else {
            break;
        };
        let id = &after[..end];
        if !id.is_empty() && !id.contains(['"', '\'']) {
            out.push(id.to_string());
        }
        rest = &after[end + 1..];
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownIds {
    traits: BTreeSet<String>,
    effects: BTreeSet<String>,
}

impl KnownIds {
    pub fn embedded() -> Self {
        Self::from_source(&EmbeddedIds)
    }

    /// Load both kinds from `source`; a kind that fails to load or loads
    /// empty uses the embedded set instead.
    pub fn from_source(source: &dyn KnownIdSource) -> Self {
        Self {
            traits: load_or_embedded(source, IdKind::Trait),
            effects: load_or_embedded(source, IdKind::Effect),
        }
    }

    /// Process-wide embedded allow-lists, built on first use.
    pub fn shared() -> Arc<KnownIds> {
        static SHARED: OnceLock<Arc<KnownIds>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(KnownIds::embedded())))
    }

    pub fn is_known_trait(&self, id: &str) -> bool {
        self.traits.contains(id)
    }

    pub fn is_known_effect(&self, id: &str) -> bool {
        self.effects.contains(id)
    }

    pub fn trait_count(&self) -> usize {
        self.traits.len()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }
}

impl Default for KnownIds {
    fn default() -> Self {
        Self::embedded()
    }
}

fn load_or_embedded(source: &dyn KnownIdSource, kind: IdKind) -> BTreeSet<String> {
    match source.load(kind) {
        Ok(ids) if !ids.is_empty() => {
            debug!(kind = kind.label(), count = ids.len(), "loaded known ids");
            return ids.into_iter().collect();
        }
        Ok(_) => debug!(kind = kind.label(), "empty id list, using embedded set"),
        Err(e) => warn!(kind = kind.label(), error = %e, "using embedded id set"),
    }
    // The embedded source cannot fail.
    EmbeddedIds
        .load(kind)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{IdKind, KnownIdError, KnownIdSource, KnownIds, parse_id_list};

    struct Fixed(Vec<&'static str>);

    impl KnownIdSource for Fixed {
        fn load(&self, kind: IdKind) -> Result<Vec<String>, KnownIdError> {
            match kind {
                IdKind::Trait => Ok(self.0.iter().map(|s| s.to_string()).collect()),
                IdKind::Effect => Err(KnownIdError::Io {
                    kind,
                    path: "missing.ts".into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
            }
        }
    }

    #[test]
    fn embedded_sets_contain_expected_ids() {
        let ids = KnownIds::embedded();
        assert_eq!(ids.trait_count(), 39);
        assert_eq!(ids.effect_count(), 33);
        assert!(ids.is_known_trait("DeeperDiversLungs"));
        assert!(ids.is_known_effect("WellFed"));
        assert!(!ids.is_known_trait("DiversLung"));
        assert!(!ids.is_known_effect("Minion"));
    }

    #[test]
    fn custom_source_replaces_one_kind_and_falls_back_for_the_other() {
        let ids = KnownIds::from_source(&Fixed(vec!["Only"]));
        assert!(ids.is_known_trait("Only"));
        assert!(!ids.is_known_trait("Snorer"));
        assert!(ids.is_known_effect("Sleep"));
    }

    #[test]
    fn empty_source_falls_back() {
        let ids = KnownIds::from_source(&Fixed(Vec::new()));
        assert!(ids.is_known_trait("Snorer"));
    }

    #[test]
    fn parses_array_literals_and_line_lists() {
        let ts = r#"export const AI_TRAIT_IDS = [
            "Snorer",
            'IronGut',
        ] as const;"#;
        assert_eq!(parse_id_list(ts), vec!["Snorer", "IronGut"]);

        let lines = "# traits\nSnorer\n\n  IronGut  # tough\n";
        assert_eq!(parse_id_list(lines), vec!["Snorer", "IronGut"]);
    }

    #[test]
    fn brackets_inside_comments_keep_line_layout() {
        let lines = "# exported from [traits] table\nSnorer\nIronGut # see [wiki]\n";
        assert_eq!(parse_id_list(lines), vec!["Snorer", "IronGut"]);

        let py = "# ids [generated]\nTRAITS = [\"Snorer\",  # loud\n  \"IronGut\"]\n";
        assert_eq!(parse_id_list(py), vec!["Snorer", "IronGut"]);
    }

    #[test]
    fn shared_ids_are_reused() {
        let a = KnownIds::shared();
        let b = KnownIds::shared();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }
}
