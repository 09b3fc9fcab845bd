use std::collections::BTreeMap;
use std::io;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::compressed;
use crate::context::ParseContext;
use crate::duplicant::DuplicantDecoder;
use crate::header::SaveGameHeader;
use crate::known_ids::KnownIds;
use crate::ksav::{self, KsavHeader};
use crate::metadata;
use crate::model::{
    DEFAULT_MINOR_VERSION, ObjectGroup, SUPPORTED_MAJOR_VERSION, SaveGame, SaveGameVersion,
    VersionSource,
};
use crate::reader::ByteCursor;
use crate::world::{WorldGridSummary, detect_world_dimensions};

use super::error::{CoreError, CoreErrorCode};
use super::types::{Entities, MinorVersionRange, ParseOptions, ParseResult, SupportedVersions};

#[derive(Debug, Clone)]
pub struct Engine {
    known_ids: Arc<KnownIds>,
    minor_versions: RangeInclusive<i32>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            known_ids: options.known_ids.unwrap_or_else(KnownIds::shared),
            minor_versions: options.minor_version_range,
        }
    }

    pub fn known_ids(&self) -> &KnownIds {
        &self.known_ids
    }

    pub fn supported_versions(&self) -> SupportedVersions {
        SupportedVersions {
            major_version: SUPPORTED_MAJOR_VERSION,
            minor_version_range: MinorVersionRange {
                min: *self.minor_versions.start(),
                max: *self.minor_versions.end(),
            },
        }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> ParseResult {
        let path = path.as_ref();
        let started = Instant::now();
        match std::fs::read(path) {
            Ok(bytes) => self.parse_bytes(bytes),
            Err(e) => {
                let message = if e.kind() == io::ErrorKind::NotFound {
                    format!("Save file not found: {}", path.display())
                } else {
                    format!("Failed to read save file {}: {e}", path.display())
                };
                ParseResult::failure(
                    CoreError::new(CoreErrorCode::Io, message),
                    Vec::new(),
                    started.elapsed(),
                )
            }
        }
    }

    pub fn parse_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> ParseResult {
        let bytes = bytes.as_ref();
        let started = Instant::now();
        info!(bytes = bytes.len(), "parsing save");

        let mut ctx = ParseContext::new();
        match self.decode(bytes, &mut ctx) {
            Ok((save_game, entities)) => {
                let parse_time = started.elapsed();
                info!(
                    cycles = save_game.header.num_cycles,
                    duplicants = entities.duplicants.len(),
                    groups = entities.object_group_counts.len(),
                    elapsed_ms = parse_time.as_secs_f64() * 1000.0,
                    "parsed save"
                );
                ParseResult {
                    success: true,
                    save_game: Some(save_game),
                    error: None,
                    warnings: ctx.into_warnings(),
                    parse_time,
                    entities,
                }
            }
            Err(error) => {
                let parse_time = started.elapsed();
                info!(%error, elapsed_ms = parse_time.as_secs_f64() * 1000.0, "save parse failed");
                ParseResult::failure(error, ctx.into_warnings(), parse_time)
            }
        }
    }

    fn decode(
        &self,
        bytes: &[u8],
        ctx: &mut ParseContext,
    ) -> Result<(SaveGame, Entities), CoreError> {
        let mut cursor = ByteCursor::new(bytes);
        let header = SaveGameHeader::parse(&mut cursor).map_err(|e| {
            CoreError::new(CoreErrorCode::Header, format!("Failed to parse header: {e}"))
        })?;
        debug!(
            build = header.build_version,
            header_version = header.header_version,
            compressed = header.is_compressed,
            "decoded header"
        );
        ctx.set_game_info(&header.game_info);

        let body = compressed::find_body(bytes).map(|block| block.bytes);
        if body.is_none() {
            ctx.warn("No compressed KSAV body found");
        }
        let body = body.as_deref();

        let version = self.resolve_version(&header, body, ctx)?;

        ctx.warn("Type templates parsing not yet implemented");
        let world = detect_world_dimensions(
            ctx.game_info(),
            body.unwrap_or_else(|| cursor.remaining_slice()),
        );
        ctx.warn("World data preserved as binary (not parsed)");
        ctx.warn("Settings parsing not yet implemented");
        ctx.warn("Simulation data preserved as binary");

        let groups = body.map(ksav::object_groups).unwrap_or_default();
        let duplicants = body.map_or_else(Vec::new, |body| {
            DuplicantDecoder::new(&self.known_ids).decode_body(body, ctx)
        });
        let save_game = SaveGame {
            header,
            version,
            templates: Vec::new(),
            world,
            settings: Default::default(),
            sim_data: Vec::new(),
            metadata: metadata::build(bytes, body),
            groups,
        };

        let entities = Entities {
            duplicants,
            object_group_counts: group_counts(&save_game.groups),
            world_grid_summary: WorldGridSummary::build(&save_game.world, &save_game.sim_data),
        };
        Ok((save_game, entities))
    }

    /// Header fields first, then the KSAV body, then the newest known
    /// version. The major version must match whichever source is used.
    fn resolve_version(
        &self,
        header: &SaveGameHeader,
        body: Option<&[u8]>,
        ctx: &mut ParseContext,
    ) -> Result<SaveGameVersion, CoreError> {
        let version = match header.declared_version() {
            (None, None) => match body.and_then(KsavHeader::locate) {
                Some(ksav) => {
                    ctx.warn(format!(
                        "Header has no save version; using KSAV fallback {}.{}",
                        ksav.major, ksav.minor
                    ));
                    SaveGameVersion {
                        major: ksav.major,
                        minor: ksav.minor,
                        source: VersionSource::KsavBody,
                    }
                }
                None => {
                    let assumed = SaveGameVersion::default();
                    ctx.warn(format!("Save version not found; assuming {assumed}"));
                    assumed
                }
            },
            (major, minor) => SaveGameVersion {
                major: major.unwrap_or(SUPPORTED_MAJOR_VERSION),
                minor: minor.unwrap_or(DEFAULT_MINOR_VERSION),
                source: VersionSource::Header,
            },
        };
        debug!(%version, source = ?version.source, "resolved save version");

        if version.major != SUPPORTED_MAJOR_VERSION {
            return Err(CoreError::new(
                CoreErrorCode::UnsupportedVersion,
                format!(
                    "Unsupported major version {}. Expected {SUPPORTED_MAJOR_VERSION}",
                    version.major
                ),
            ));
        }
        if !self.minor_versions.contains(&version.minor) {
            ctx.warn(format!(
                "Minor version {} may not be fully supported (supported version range {}-{})",
                version.minor,
                self.minor_versions.start(),
                self.minor_versions.end()
            ));
        }
        Ok(version)
    }
}

fn group_counts(groups: &[ObjectGroup]) -> BTreeMap<String, u64> {
    groups
        .iter()
        .map(|g| (g.name.clone(), u64::from(g.instance_count)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Engine;
    use crate::core_api::{CoreErrorCode, ParseOptions};
    use crate::known_ids::KnownIds;

    fn header_only(json: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&600_000u32.to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(json.as_bytes());
        out
    }

    #[test]
    fn header_without_body_still_succeeds() {
        let result = Engine::new().parse_bytes(header_only(
            r#"{"baseName":"Test","numberOfCycles":5,"saveMajorVersion":7,"saveMinorVersion":35}"#,
        ));
        assert!(result.success, "{:?}", result.error);
        let save = result.save_game.expect("save game");
        assert_eq!(save.header.num_cycles, 5);
        assert_eq!(save.version.to_string(), "7.35");
        assert!(result.entities.object_group_counts.is_empty());
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w == "No compressed KSAV body found")
        );
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w == "Simulation data preserved as binary")
        );
    }

    #[test]
    fn major_version_mismatch_is_fatal() {
        let result = Engine::new().parse_bytes(header_only(r#"{"saveMajorVersion":8}"#));
        assert!(!result.success);
        assert!(result.save_game.is_none());
        let error = result.error.as_ref().expect("error");
        assert_eq!(error.code(), CoreErrorCode::UnsupportedVersion);
        assert!(result.error_message().is_some_and(|m| m.contains("version")));
    }

    #[test]
    fn truncated_header_is_a_header_error() {
        let result = Engine::new().parse_bytes([1u8, 2, 3]);
        assert!(!result.success);
        assert_eq!(
            result.error.map(|e| e.code),
            Some(CoreErrorCode::Header)
        );
    }

    #[test]
    fn custom_minor_range_is_reported_and_enforced() {
        let engine = Engine::with_options(ParseOptions {
            known_ids: Some(Arc::new(KnownIds::embedded())),
            minor_version_range: 20..=30,
        });
        let versions = engine.supported_versions();
        assert_eq!(versions.major_version, 7);
        assert_eq!(versions.minor_version_range.min, 20);
        assert_eq!(versions.minor_version_range.max, 30);

        let result = engine.parse_bytes(header_only(r#"{"saveMinorVersion":35}"#));
        assert!(result.success);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("Minor version 35") && w.contains("20-30"))
        );
    }

    #[test]
    fn missing_version_without_body_assumes_default() {
        let result = Engine::new().parse_bytes(header_only("{}"));
        assert!(result.success);
        let save = result.save_game.expect("save game");
        assert_eq!(save.version.to_string(), "7.36");
        assert!(result.warnings.iter().any(|w| w.contains("assuming 7.36")));
    }
}
