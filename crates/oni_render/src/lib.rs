use std::fmt::{self, Write as _};

use oni_core::core_api::Entities;
use oni_core::model::{Duplicant, NO_ROLE, SaveGame, VitalField, Vitals};
use oni_core::world::{WorldGridSummary, structures_histogram};
use serde_json::{Map as JsonMap, Value as JsonValue};

const NAME_COL_WIDTH: usize = 20;
const ROLE_COL_WIDTH: usize = 18;
const STRUCTURE_COL_WIDTH: usize = 32;
const TOP_STRUCTURES: usize = 10;

#[rustfmt::skip]
const VITAL_KEYS: [(&str, VitalField); 12] = [
    ("calories",          VitalField::Calories),
    ("health",            VitalField::Health),
    ("stress",            VitalField::Stress),
    ("stamina",           VitalField::Stamina),
    ("decor",             VitalField::Decor),
    ("temperature",       VitalField::Temperature),
    ("breath",            VitalField::Breath),
    ("bladder",           VitalField::Bladder),
    ("immune_level",      VitalField::ImmuneLevel),
    ("toxicity",          VitalField::Toxicity),
    ("radiation_balance", VitalField::RadiationBalance),
    ("morale",            VitalField::Morale),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    ContractV1,
}

/// The four-section contract document for a parsed save.
pub fn extract(save: &SaveGame, entities: &Entities) -> JsonValue {
    render_json(save, entities, JsonStyle::ContractV1)
}

pub fn render_json(save: &SaveGame, entities: &Entities, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::ContractV1 => JsonValue::Object(contract_json(save, entities)),
    }
}

fn contract_json(save: &SaveGame, entities: &Entities) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert("metadata".to_string(), metadata_to_json(save));
    out.insert(
        "duplicants".to_string(),
        duplicants_to_json(save, &entities.duplicants),
    );
    out.insert(
        "world_grid_summary".to_string(),
        world_to_json(&entities.world_grid_summary),
    );
    out.insert(
        "object_group_counts".to_string(),
        JsonValue::Object(
            entities
                .object_group_counts
                .iter()
                .map(|(name, count)| (name.clone(), JsonValue::from(*count)))
                .collect(),
        ),
    );
    out
}

fn metadata_to_json(save: &SaveGame) -> JsonValue {
    let header = &save.header;
    let mut m = JsonMap::new();
    m.insert(
        "version".to_string(),
        JsonValue::String(save.version.to_string()),
    );
    m.insert("cycles".to_string(), JsonValue::from(header.num_cycles));
    m.insert(
        "duplicant_count".to_string(),
        JsonValue::from(header.num_duplicants),
    );
    m.insert(
        "base_name".to_string(),
        JsonValue::String(header.base_name().to_string()),
    );
    m.insert(
        "cluster_id".to_string(),
        JsonValue::String(header.cluster_id.clone()),
    );
    m.insert(
        "game_info".to_string(),
        JsonValue::Object(header.game_info.clone()),
    );
    JsonValue::Object(m)
}

fn duplicant_count(save: &SaveGame, decoded: usize) -> u64 {
    match save.header.num_duplicants {
        0 => decoded as u64,
        n => n,
    }
}

fn duplicants_to_json(save: &SaveGame, duplicants: &[Duplicant]) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "count".to_string(),
        JsonValue::from(duplicant_count(save, duplicants.len())),
    );
    m.insert(
        "list".to_string(),
        JsonValue::Array(duplicants.iter().map(duplicant_to_json).collect()),
    );
    JsonValue::Object(m)
}

fn duplicant_to_json(d: &Duplicant) -> JsonValue {
    let mut identity = JsonMap::new();
    identity.insert("name".to_string(), optional_string(&d.identity.name));
    identity.insert("gender".to_string(), optional_string(&d.identity.gender));
    identity.insert(
        "arrival_time".to_string(),
        JsonValue::from(d.identity.arrival_time),
    );

    let mut position = JsonMap::new();
    position.insert("x".to_string(), JsonValue::from(f64::from(d.position.x)));
    position.insert("y".to_string(), JsonValue::from(f64::from(d.position.y)));
    position.insert("z".to_string(), JsonValue::from(f64::from(d.position.z)));

    let role = if d.role.is_empty() { NO_ROLE } else { &d.role };

    let mut m = JsonMap::new();
    m.insert("identity".to_string(), JsonValue::Object(identity));
    m.insert("role".to_string(), JsonValue::String(role.to_string()));
    m.insert("vitals".to_string(), vitals_to_json(&d.vitals));
    m.insert("traits".to_string(), strings_to_json(&d.traits));
    m.insert("effects".to_string(), strings_to_json(&d.effects));
    m.insert(
        "aptitudes".to_string(),
        JsonValue::Object(
            d.aptitudes
                .iter()
                .map(|(group, level)| (group.as_str().to_string(), JsonValue::from(*level)))
                .collect(),
        ),
    );
    m.insert("position".to_string(), JsonValue::Object(position));
    JsonValue::Object(m)
}

fn vitals_to_json(vitals: &Vitals) -> JsonValue {
    JsonValue::Object(
        VITAL_KEYS
            .iter()
            .map(|(key, field)| {
                let value = vitals.get(*field).map_or(JsonValue::Null, JsonValue::from);
                ((*key).to_string(), value)
            })
            .collect(),
    )
}

fn world_to_json(summary: &WorldGridSummary) -> JsonValue {
    let histogram = |counts: &std::collections::BTreeMap<String, u64>| {
        JsonValue::Object(
            counts
                .iter()
                .map(|(k, v)| (k.clone(), JsonValue::from(*v)))
                .collect(),
        )
    };
    let mut histograms = JsonMap::new();
    histograms.insert(
        "elements".to_string(),
        histogram(&summary.histograms.elements),
    );
    histograms.insert(
        "temperatures".to_string(),
        histogram(&summary.histograms.temperatures),
    );
    histograms.insert(
        "diseases".to_string(),
        histogram(&summary.histograms.diseases),
    );
    histograms.insert(
        "radiation".to_string(),
        histogram(&summary.histograms.radiation),
    );

    let mut m = JsonMap::new();
    m.insert("width".to_string(), JsonValue::from(summary.width));
    m.insert("height".to_string(), JsonValue::from(summary.height));
    m.insert("cell_count".to_string(), JsonValue::from(summary.cell_count));
    m.insert("histograms".to_string(), JsonValue::Object(histograms));
    m.insert(
        "breathable_percent".to_string(),
        summary
            .breathable_percent
            .map_or(JsonValue::Null, JsonValue::from),
    );
    m.insert("warnings".to_string(), strings_to_json(&summary.warnings));
    JsonValue::Object(m)
}

fn optional_string(value: &Option<String>) -> JsonValue {
    value
        .as_ref()
        .map_or(JsonValue::Null, |s| JsonValue::String(s.clone()))
}

fn strings_to_json(items: &[String]) -> JsonValue {
    JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
}

/// Plain-text colony report: header facts, one line per duplicant and the
/// most common object groups.
pub fn render_summary_text(save: &SaveGame, entities: &Entities) -> String {
    let mut out = String::new();
    match write_summary(&mut out, save, entities) {
        Ok(()) => out,
        Err(_) => String::new(),
    }
}

fn write_summary(out: &mut String, save: &SaveGame, entities: &Entities) -> fmt::Result {
    let header = &save.header;
    let base_name = match header.base_name() {
        "" => "(unnamed colony)",
        name => name,
    };
    writeln!(out, "Colony: {base_name}")?;
    writeln!(
        out,
        "Version: {}   Cycles: {}   Duplicants: {}",
        save.version,
        format_number_with_commas(header.num_cycles),
        duplicant_count(save, entities.duplicants.len())
    )?;
    if !header.cluster_id.is_empty() {
        writeln!(out, "Cluster: {}", header.cluster_id)?;
    }
    let world = &entities.world_grid_summary;
    if world.cell_count > 0 {
        writeln!(
            out,
            "World: {} x {} cells ({})",
            world.width,
            world.height,
            format_number_with_commas(world.cell_count)
        )?;
    } else {
        writeln!(out, "World: unknown size")?;
    }

    writeln!(out)?;
    writeln!(out, "Duplicants ({})", entities.duplicants.len())?;
    for d in &entities.duplicants {
        let name = d.identity.name.as_deref().unwrap_or("?");
        let mut line = format!(
            "  {:<nw$}{:<rw$}",
            fit_column(name, NAME_COL_WIDTH - 1),
            fit_column(&d.role, ROLE_COL_WIDTH - 1),
            nw = NAME_COL_WIDTH,
            rw = ROLE_COL_WIDTH
        );
        if let Some(stress) = d.vitals.stress {
            write!(line, "stress {stress:.1}  ")?;
        }
        if !d.traits.is_empty() {
            write!(line, "traits: {}", d.traits.join(", "))?;
        }
        writeln!(out, "{}", line.trim_end())?;
    }

    let top = structures_histogram(&entities.object_group_counts, TOP_STRUCTURES);
    if !top.is_empty() {
        writeln!(out)?;
        writeln!(out, "Top object groups")?;
        for (name, count) in top {
            writeln!(
                out,
                "  {:<w$}{:>10}",
                fit_column(&name, STRUCTURE_COL_WIDTH - 1),
                format_number_with_commas(count),
                w = STRUCTURE_COL_WIDTH
            )?;
        }
    }
    Ok(())
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }
    let mut out: String = value.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

fn format_number_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{fit_column, format_number_with_commas};

    #[test]
    fn numbers_are_grouped_by_thousands() {
        assert_eq!(format_number_with_commas(0), "0");
        assert_eq!(format_number_with_commas(999), "999");
        assert_eq!(format_number_with_commas(1_234_567), "1,234,567");
    }

    #[test]
    fn long_columns_are_ellipsized() {
        assert_eq!(fit_column("Meep", 8), "Meep");
        assert_eq!(fit_column("Mi-Ma the Tall", 8), "Mi-Ma...");
        assert_eq!(fit_column("abcdef", 2), "ab");
    }
}
