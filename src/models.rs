use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Kinds of work-log entity a factor can count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityType {
    Records,
    Jobs,
    Tasks,
    Notes,
    Companies,
    People,
    Projects,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionKind {
    Create,
    Interaction,
}

/// A configurable scoring rule. Owned by the store; the engine reads it and
/// only writes `active`, `threshold` and `weight` back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorDefinition {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub action_kind: ActionKind,
    pub weight: i64,
    pub threshold: i64,
    pub active: bool,
}

impl FactorDefinition {
    pub fn new(entity_type: EntityType, action_kind: ActionKind, weight: i64, threshold: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            action_kind,
            weight,
            threshold,
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.entity_type, self.action_kind)
    }
}

/// Closed lookup table for band labels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActivityWeight {
    Empty,
    Light,
    Moderate,
    Heavy,
    Significant,
}

impl ActivityWeight {
    pub fn from_label(label: &str) -> Option<Self> {
        Self::from_str(label.trim()).ok()
    }

    /// Built-in colour used when no band overrides it.
    pub fn default_colour(self) -> Colour {
        match self {
            ActivityWeight::Empty => Colour::rgb(0xE5, 0xE5, 0xEA),
            ActivityWeight::Light => Colour::rgb(0xC6, 0xE4, 0xC3),
            ActivityWeight::Moderate => Colour::rgb(0x7F, 0xC9, 0x7A),
            ActivityWeight::Heavy => Colour::rgb(0x3A, 0x9E, 0x4F),
            ActivityWeight::Significant => Colour::rgb(0x1B, 0x5E, 0x20),
        }
    }

    /// Single character used by the text grid.
    pub fn marker(self) -> char {
        match self {
            ActivityWeight::Empty => '.',
            ActivityWeight::Light => '-',
            ActivityWeight::Moderate => '+',
            ActivityWeight::Heavy => '*',
            ActivityWeight::Significant => '#',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const TRANSPARENT: Colour = Colour { r: 0, g: 0, b: 0, a: 0 };
    pub const TODAY: Colour = Colour { r: 0x0A, g: 0x84, b: 0xFF, a: 0xFF };
    pub const SELECTED: Colour = Colour { r: 0xFF, g: 0xD6, b: 0x0A, a: 0xFF };
    pub const WEEKEND_WARNING: Colour = Colour { r: 0xFF, g: 0x45, b: 0x3A, a: 0xFF };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub fn to_hex(self) -> String {
        if self.a == 0xFF {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid colour '{0}': expected #RRGGBB or #RRGGBBAA")]
pub struct ColourParseError(String);

impl FromStr for Colour {
    type Err = ColourParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ColourParseError(value.to_string());
        let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| invalid());
        let alpha = if hex.len() == 8 { channel(6)? } else { 0xFF };

        Ok(Colour {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: alpha,
        })
    }
}

impl TryFrom<String> for Colour {
    type Error = ColourParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Colour> for String {
    fn from(value: Colour) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightBand {
    pub label: String,
    /// Lower bound of the band's score range.
    pub value: i64,
    /// Reference score for the band; the largest one marks the overflow point.
    pub default_value: i64,
    pub colour: Option<Colour>,
}

impl WeightBand {
    pub fn new(label: impl Into<String>, value: i64, default_value: i64) -> Self {
        Self {
            label: label.into(),
            value,
            default_value,
            colour: None,
        }
    }

    pub fn with_colour(mut self, colour: Colour) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn weight(&self) -> Option<ActivityWeight> {
        ActivityWeight::from_label(&self.label)
    }
}

/// Configured bands, always held ascending by `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightBands(Vec<WeightBand>);

impl WeightBands {
    pub fn new(mut bands: Vec<WeightBand>) -> Self {
        bands.sort_by_key(|band| band.value);
        Self(bands)
    }

    pub fn standard() -> Self {
        Self::new(vec![
            WeightBand::new("empty", 0, 0),
            WeightBand::new("light", 1, 3),
            WeightBand::new("moderate", 4, 10),
            WeightBand::new("significant", 11, 11),
        ])
    }

    pub fn as_slice(&self) -> &[WeightBand] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The band with the greatest `default_value`, if any are configured.
    pub fn heaviest_by_default(&self) -> Option<&WeightBand> {
        self.0.iter().max_by_key(|band| band.default_value)
    }

    /// Colour override configured for a weight, if a band supplies one.
    pub fn colour_override(&self, weight: ActivityWeight) -> Option<Colour> {
        self.0
            .iter()
            .filter(|band| band.weight() == Some(weight))
            .find_map(|band| band.colour)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub entity: EntityType,
    pub job_id: Option<Uuid>,
    pub occurred_on: NaiveDate,
    pub text: String,
}

impl ActivityEntry {
    pub fn new(entity: EntityType, occurred_on: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity,
            job_id: None,
            occurred_on,
            text: text.into(),
        }
    }

    pub fn for_job(mut self, job_id: Uuid) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entity_and_action_text() {
        assert_eq!("records".parse::<EntityType>().unwrap(), EntityType::Records);
        assert_eq!("Jobs".parse::<EntityType>().unwrap(), EntityType::Jobs);
        assert_eq!("interaction".parse::<ActionKind>().unwrap(), ActionKind::Interaction);
        assert_eq!(EntityType::People.to_string(), "people");
        assert!("invoices".parse::<EntityType>().is_err());
    }

    #[test]
    fn weight_labels_use_closed_table() {
        assert_eq!(ActivityWeight::from_label("moderate"), Some(ActivityWeight::Moderate));
        assert_eq!(ActivityWeight::from_label(" Significant "), Some(ActivityWeight::Significant));
        assert_eq!(ActivityWeight::from_label("frantic"), None);
    }

    #[test]
    fn colours_parse_and_render_hex() {
        let colour: Colour = "#1b5e20".parse().unwrap();
        assert_eq!(colour, Colour::rgb(0x1B, 0x5E, 0x20));
        assert_eq!(colour.to_hex(), "#1B5E20");
        assert_eq!(Colour::TRANSPARENT.to_hex(), "#00000000");
        assert!("1B5E20".parse::<Colour>().is_err());
        assert!("#1B5E2".parse::<Colour>().is_err());

        let json = serde_json::to_string(&Colour::TODAY).unwrap();
        assert_eq!(json, "\"#0A84FF\"");
    }

    #[test]
    fn bands_sort_ascending_and_find_overrides() {
        let bands = WeightBands::new(vec![
            WeightBand::new("significant", 11, 11),
            WeightBand::new("empty", 0, 0),
            WeightBand::new("light", 1, 3).with_colour(Colour::rgb(1, 2, 3)),
        ]);
        let labels: Vec<&str> = bands.as_slice().iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["empty", "light", "significant"]);
        assert_eq!(bands.heaviest_by_default().unwrap().label, "significant");
        assert_eq!(bands.colour_override(ActivityWeight::Light), Some(Colour::rgb(1, 2, 3)));
        assert_eq!(bands.colour_override(ActivityWeight::Empty), None);
    }
}
