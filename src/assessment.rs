use chrono::NaiveDate;
use serde::Serialize;

use crate::assessables::Assessables;
use crate::ledger::ActivitySource;
use crate::models::{ActivityWeight, Colour, FactorDefinition, WeightBands};

/// Calendar flags for one grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayFlags {
    pub is_selected: bool,
    pub is_weekend: bool,
    pub is_today: bool,
}

/// Scored view of one day in the month grid. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct DayAssessment {
    date: Option<NaiveDate>,
    day_number: u32,
    flags: DayFlags,
    assessables: Assessables,
    band_colour: Colour,
}

impl DayAssessment {
    pub fn new(
        factors: &[FactorDefinition],
        bands: &WeightBands,
        date: NaiveDate,
        day_number: u32,
        flags: DayFlags,
        source: &impl ActivitySource,
    ) -> Self {
        let assessables = Assessables::evaluate(factors, bands, Some(date), source);
        let weight = assessables.weight();

        Self {
            date: Some(date),
            day_number,
            flags,
            band_colour: bands
                .colour_override(weight)
                .unwrap_or_else(|| weight.default_colour()),
            assessables,
        }
    }

    /// Padding cell placed before day one; never scored.
    pub fn blank() -> Self {
        Self {
            date: None,
            day_number: 0,
            flags: DayFlags::default(),
            assessables: Assessables::blank(),
            band_colour: Colour::TRANSPARENT,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn day_number(&self) -> u32 {
        self.day_number
    }

    pub fn is_blank(&self) -> bool {
        self.day_number == 0
    }

    pub fn is_selected(&self) -> bool {
        self.flags.is_selected
    }

    pub fn is_weekend(&self) -> bool {
        self.flags.is_weekend
    }

    pub fn is_today(&self) -> bool {
        self.flags.is_today
    }

    pub fn score(&self) -> i64 {
        self.assessables.score()
    }

    pub fn weight(&self) -> ActivityWeight {
        self.assessables.weight()
    }

    pub fn assessables(&self) -> &Assessables {
        &self.assessables
    }

    pub fn day_label(&self) -> String {
        if self.is_blank() {
            String::new()
        } else {
            self.day_number.to_string()
        }
    }

    pub fn weight_label(&self) -> &'static str {
        self.weight().into()
    }

    /// Cell colour. Today beats selected, which beats weekend highlighting,
    /// which beats the band colour.
    pub fn background_colour(&self) -> Colour {
        if self.is_blank() {
            return Colour::TRANSPARENT;
        }

        if self.flags.is_today {
            Colour::TODAY
        } else if self.flags.is_selected {
            Colour::SELECTED
        } else if self.flags.is_weekend && self.score() > 0 {
            Colour::WEEKEND_WARNING
        } else if self.flags.is_weekend {
            Colour::TRANSPARENT
        } else {
            self.band_colour
        }
    }
}
