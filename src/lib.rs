//! Daily activity assessment for a personal work log: counts what happened
//! each day, scores it against configurable factors and bands the result
//! into a colour-coded month grid.

pub mod activities;
pub mod assessables;
pub mod assessment;
pub mod config;
pub mod db;
pub mod factors;
pub mod ledger;
pub mod models;
pub mod report;
pub mod store;
pub mod telemetry;

pub use activities::{assess_month, Activities, AssessmentRequest, MonthAssessment};
pub use assessables::{classify, Assessables, FactorResult};
pub use assessment::{DayAssessment, DayFlags};
pub use factors::{FactorError, FactorUpdate};
pub use ledger::{ActivityLedger, ActivitySource};
pub use models::{ActionKind, ActivityWeight, Colour, EntityType, FactorDefinition, WeightBand, WeightBands};
pub use store::{AssessmentStore, MemoryStore};
