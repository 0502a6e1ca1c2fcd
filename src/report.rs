use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::Datelike;

use crate::activities::MonthAssessment;
use crate::assessment::DayAssessment;
use crate::models::FactorDefinition;

#[derive(Debug, Clone)]
pub struct FactorSummary {
    pub factor: String,
    pub active: bool,
    pub occurrences: i64,
    pub contribution: i64,
}

/// Month totals per factor, biggest contribution first.
pub fn summarize_factors(month: &MonthAssessment) -> Vec<FactorSummary> {
    let mut map: BTreeMap<String, FactorSummary> = BTreeMap::new();

    for day in month.real_days() {
        for result in day.assessables().factors() {
            let definition: &FactorDefinition = &result.definition;
            let entry = map
                .entry(definition.describe())
                .or_insert_with(|| FactorSummary {
                    factor: definition.describe(),
                    active: definition.active,
                    occurrences: 0,
                    contribution: 0,
                });
            entry.occurrences = entry.occurrences.saturating_add(result.count);
            entry.contribution = entry.contribution.saturating_add(result.contribution());
        }
    }

    let mut summaries: Vec<FactorSummary> = map.into_values().collect();
    summaries.sort_by(|a, b| {
        b.contribution
            .cmp(&a.contribution)
            .then(b.occurrences.cmp(&a.occurrences))
    });
    summaries
}

/// Monday-first text calendar with one weight marker per day.
pub fn render_grid(month: &MonthAssessment) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}", month.reference_date().format("%B %Y"));
    let _ = writeln!(output, " Mo   Tu   We   Th   Fr   Sa   Su");

    // Columns come from each day's weekday, not from the model's padding.
    let padding = month
        .real_days()
        .find_map(DayAssessment::date)
        .map_or(0, |date| date.weekday().num_days_from_monday() as usize);
    let mut cells = vec!["    ".to_string(); padding];
    cells.extend(month.real_days().map(|day| {
        let marker = if day.is_selected() { '>' } else { ' ' };
        format!("{marker}{:>2}{}", day.day_number(), day.weight().marker())
    }));

    for week in cells.chunks(7) {
        let _ = writeln!(output, "{}", week.join(" ").trim_end());
    }

    let _ = writeln!(output, "Month score: {}", month.month_score());
    output
}

pub fn build_report(month: &MonthAssessment) -> String {
    let mut output = String::new();
    let label = month.reference_date().format("%B %Y");

    let _ = writeln!(output, "# Activity Assessment: {}", label);
    if month.search_term().trim().is_empty() {
        let _ = writeln!(output, "All activity, month score {}", month.month_score());
    } else {
        let _ = writeln!(
            output,
            "Activity matching \"{}\", month score {}",
            month.search_term().trim(),
            month.month_score()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weight Mix");
    for (weight, days) in month.weight_distribution() {
        let _ = writeln!(output, "- {}: {} days", weight, days);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Busiest Days");
    let busiest = month.busiest_days(5);
    if busiest.is_empty() {
        let _ = writeln!(output, "No activity recorded this month.");
    } else {
        for day in busiest {
            if let Some(date) = day.date() {
                let _ = writeln!(
                    output,
                    "- {} ({}): score {}, {}",
                    date,
                    date.format("%a"),
                    day.score(),
                    day.weight_label()
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekend Work");
    let weekend = month.weekend_work();
    if weekend.is_empty() {
        let _ = writeln!(output, "No weekend activity.");
    } else {
        for day in weekend {
            if let Some(date) = day.date() {
                let _ = writeln!(output, "- {} ({}): score {}", date, date.format("%a"), day.score());
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Factor Mix");
    let summaries = summarize_factors(month);
    if summaries.is_empty() {
        let _ = writeln!(output, "No factors configured.");
    } else {
        for summary in summaries {
            let state = if summary.active { "" } else { " (inactive)" };
            let _ = writeln!(
                output,
                "- {}{}: {} occurrences, {} points",
                summary.factor, state, summary.occurrences, summary.contribution
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::activities::{Activities, AssessmentRequest};
    use crate::ledger::ActivityLedger;
    use crate::models::{ActionKind, ActivityEntry, EntityType, WeightBands};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    fn sample_month() -> MonthAssessment {
        let factors = vec![
            FactorDefinition::new(EntityType::Records, ActionKind::Create, 1, 0),
            FactorDefinition::new(EntityType::Notes, ActionKind::Create, 2, 0).inactive(),
        ];
        let ledger = ActivityLedger::new(vec![
            ActivityEntry::new(EntityType::Records, date(1), "saturday deploy"),
            ActivityEntry::new(EntityType::Records, date(4), "review"),
            ActivityEntry::new(EntityType::Records, date(4), "retro"),
            ActivityEntry::new(EntityType::Notes, date(4), "retro notes"),
        ]);
        Activities::build(
            &AssessmentRequest::new(date(4)).with_today(date(20)),
            &factors,
            &WeightBands::standard(),
            &ledger,
        )
    }

    #[test]
    fn factor_summary_totals_month() {
        let summaries = summarize_factors(&sample_month());
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].factor, "records create");
        assert_eq!(summaries[0].occurrences, 3);
        assert_eq!(summaries[0].contribution, 3);
        assert!(!summaries[1].active);
        assert_eq!(summaries[1].occurrences, 1);
        assert_eq!(summaries[1].contribution, 0);
    }

    #[test]
    fn report_lists_sections() {
        let report = build_report(&sample_month());
        assert!(report.starts_with("# Activity Assessment: August 2026"));
        assert!(report.contains("All activity, month score 3"));
        assert!(report.contains("- 2026-08-04 (Tue): score 2, light"));
        assert!(report.contains("## Weekend Work\n- 2026-08-01 (Sat): score 1"));
        assert!(report.contains("- notes create (inactive): 1 occurrences, 0 points"));
    }

    #[test]
    fn grid_pads_first_week_and_marks_selection() {
        let grid = render_grid(&sample_month());
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines[0], "August 2026");
        // August 2026 starts on a Saturday: five padding cells.
        assert_eq!(lines[2], format!("{}  1-   2.", " ".repeat(4 * 5 + 5)));
        assert!(lines[3].starts_with("  3. >  4-"));
        assert_eq!(lines.last().copied(), Some("Month score: 3"));
    }

    #[test]
    fn grid_puts_sunday_first_month_under_sunday() {
        let first = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let month = Activities::build(
            &AssessmentRequest::new(first).with_today(first),
            &[],
            &WeightBands::standard(),
            &ActivityLedger::default(),
        );
        assert_eq!(month.blank_days(), 0);

        let grid = render_grid(&month);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines[0], "March 2026");
        assert_eq!(lines[2], format!("{}> 1.", " ".repeat(4 * 6 + 6)));
        assert!(lines[3].starts_with("  2.   3."));
        assert!(lines[7].starts_with(" 30.  31."));
    }
}
