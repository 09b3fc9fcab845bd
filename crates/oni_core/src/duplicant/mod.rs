//! Decoder for duplicant (`Minion`) instances in the object body.
//!
//! Each instance carries a transform followed by named behavior blocks.
//! Identity, resume, accessory, trait, effect and modifier behaviors are
//! decoded; anything else is skipped by length. Behavior decoders only ever
//! see their own payload.

mod accessorizer;
mod identity;
mod lists;
mod modifiers;
mod resume;
mod scan;
mod types;

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::context::ParseContext;
use crate::known_ids::KnownIds;
use crate::ksav;
use crate::model::{Duplicant, Identity, NO_ROLE, Vector3, Vitals};
use crate::reader::{ByteCursor, ReadError};

pub(crate) use scan::first_i32_in_range;
pub use types::SkillGroup;

pub const MINION_GROUP: &str = "Minion";

#[derive(Debug, Clone, Copy)]
pub struct DuplicantDecoder<'k> {
    known: &'k KnownIds,
}

/// A decoded instance. `truncated` holds the read error that ended the
/// behavior list early; the duplicant keeps whatever came before it.
#[derive(Debug, Clone)]
pub struct DecodedInstance {
    pub duplicant: Duplicant,
    pub truncated: Option<ReadError>,
}

/// Per-instance accumulator. Fields fill in as behaviors are met; the first
/// decoded value of each wins.
#[derive(Debug, Default)]
struct Parts {
    name: Option<String>,
    gender: Option<String>,
    arrival_time: Option<u64>,
    resume_role: Option<String>,
    hat_role: Option<String>,
    vitals: Vitals,
    traits: Option<Vec<String>>,
    effects: Option<Vec<String>>,
    aptitudes: Option<BTreeMap<SkillGroup, u8>>,
    mastered_roles: Option<Vec<String>>,
}

impl Parts {
    /// A resume role beats a hat role regardless of which block came first.
    fn role(&self) -> String {
        self.resume_role
            .as_deref()
            .filter(|r| !r.is_empty() && *r != NO_ROLE)
            .or(self.hat_role.as_deref())
            .unwrap_or(NO_ROLE)
            .to_string()
    }

    fn into_duplicant(self, position: Vector3) -> Duplicant {
        let role = self.role();
        Duplicant {
            identity: Identity {
                name: self.name,
                gender: self.gender,
                arrival_time: self.arrival_time.unwrap_or(0),
            },
            role,
            vitals: self.vitals,
            traits: self.traits.unwrap_or_default(),
            effects: self.effects.unwrap_or_default(),
            aptitudes: self.aptitudes.unwrap_or_default(),
            mastered_roles: self.mastered_roles.unwrap_or_default(),
            position,
        }
    }
}

impl<'k> DuplicantDecoder<'k> {
    pub fn new(known: &'k KnownIds) -> Self {
        Self { known }
    }

    /// Decode every `Minion` instance in an inflated body.
    pub fn decode_body(&self, body: &[u8], ctx: &mut ParseContext) -> Vec<Duplicant> {
        let mut out = Vec::new();
        for group in ksav::groups(body).filter(|g| g.name == MINION_GROUP) {
            let mut c = ByteCursor::new(group.data);
            for index in 0..group.instance_count {
                match self.decode_instance(&mut c) {
                    Ok(DecodedInstance {
                        duplicant,
                        truncated: None,
                    }) => out.push(duplicant),
                    Ok(DecodedInstance {
                        duplicant,
                        truncated: Some(e),
                    }) => {
                        out.push(duplicant);
                        ctx.warn(format!(
                            "Minion instance {index} of {} has a truncated behavior block: {e}",
                            group.instance_count
                        ));
                        break;
                    }
                    Err(e) => {
                        ctx.warn(format!(
                            "Minion instance {index} of {} is truncated: {e}",
                            group.instance_count
                        ));
                        break;
                    }
                }
            }
        }
        debug!(count = out.len(), "decoded duplicants");
        out
    }

    /// One instance: 3×f32 position, 4×f32 rotation, 3×f32 scale, a folder
    /// byte, then `behavior_count` blocks of `{name, int32 len, payload}`.
    ///
    /// Only a short transform is an error. A behavior block that overruns the
    /// data ends the behavior list.
    pub fn decode_instance(&self, c: &mut ByteCursor<'_>) -> Result<DecodedInstance, ReadError> {
        let position = Vector3 {
            x: c.read_f32()?,
            y: c.read_f32()?,
            z: c.read_f32()?,
        };
        // rotation, scale, folder flag
        c.skip(4 * 4 + 3 * 4 + 1)?;
        let behavior_count = c.read_i32()?.max(0);

        let mut parts = Parts::default();
        let mut truncated = None;
        for _ in 0..behavior_count {
            match read_behavior(c) {
                Ok((name, payload)) => self.apply_behavior(&name, payload, &mut parts),
                Err(e) => {
                    truncated = Some(e);
                    break;
                }
            }
        }
        Ok(DecodedInstance {
            duplicant: parts.into_duplicant(position),
            truncated,
        })
    }

    fn apply_behavior(&self, name: &str, payload: &[u8], parts: &mut Parts) {
        match name {
            "MinionIdentity" => {
                let identity = identity::decode(payload);
                parts.name = parts.name.take().or(identity.name);
                parts.gender = parts.gender.take().or(identity.gender);
                if parts.arrival_time.is_none() && identity.arrival_time > 0 {
                    parts.arrival_time = Some(identity.arrival_time);
                }
            }
            "MinionResume" => {
                let resume = resume::decode(payload);
                parts.resume_role = parts.resume_role.take().or(resume.current_role);
                if parts.aptitudes.is_none() && !resume.aptitudes.is_empty() {
                    parts.aptitudes = Some(resume.aptitudes);
                }
                if parts.mastered_roles.is_none() && !resume.mastered_roles.is_empty() {
                    parts.mastered_roles = Some(resume.mastered_roles);
                }
            }
            "Accessorizer" | "WearableAccessorizer" => {
                if parts.hat_role.is_none() {
                    parts.hat_role = accessorizer::hat_role(payload);
                }
            }
            "Klei.AI.Traits" | "Traits" => {
                let traits = lists::traits(payload, self.known);
                if parts.traits.is_none() && !traits.is_empty() {
                    parts.traits = Some(traits);
                }
            }
            "Klei.AI.Effects" | "Effects" => {
                let effects = lists::effects(payload, self.known);
                if parts.effects.is_none() && !effects.is_empty() {
                    parts.effects = Some(effects);
                }
            }
            "MinionModifiers" | "Modifiers" => modifiers::apply(payload, &mut parts.vitals),
            other => trace!(behavior = other, len = payload.len(), "skipping behavior"),
        }
    }
}

fn read_behavior<'a>(c: &mut ByteCursor<'a>) -> Result<(String, &'a [u8]), ReadError> {
    let name = c.read_string_lossy()?;
    let len = c.read_i32()?.max(0) as usize;
    let payload = c.read_bytes(len)?;
    Ok((name, payload))
}
