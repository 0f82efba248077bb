//! Structural gates: config completeness and the shape of the workout set.

use super::GateContext;
use crate::core::finding::{Finding, Severity, checks};
use crate::core::package::{ArtifactKind, as_whole_number, lookup};
use crate::core::workout::SessionCategory;
use regex::Regex;
use std::sync::LazyLock;

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^W\d{2}_[1-7](Mon|Tue|Wed|Thu|Fri|Sat|Sun)_[A-Z][a-z]{2}\d{1,2}_.+\.zwo$")
        .expect("static regex")
});

const WORKOUTS: &str = "workouts";

/// Every configured key must be present in its config artifact.
pub fn check_required_sections(ctx: GateContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for required in &ctx.rules.config {
        // Absent or unparseable artifacts were already reported.
        let Some(doc) = ArtifactKind::from_rel_path(&required.artifact)
            .and_then(|kind| ctx.configs.get(kind))
        else {
            continue;
        };
        if !doc.is_object() {
            findings.push(Finding::critical(
                checks::CONFIG_SECTION,
                required.artifact.as_str(),
                format!("{} is not a key/value document", required.artifact),
            ));
            continue;
        }
        for key in &required.keys {
            if lookup(doc, key).is_none() {
                findings.push(Finding::critical(
                    checks::CONFIG_SECTION,
                    required.artifact.as_str(),
                    format!("Missing section '{}' in {}", key, required.artifact),
                ));
            }
        }
    }
    findings
}

/// Plan length in the plan config must agree with the derived parameters.
pub fn check_config_consistency(ctx: GateContext<'_>) -> Vec<Finding> {
    let weeks = |kind| {
        ctx.configs
            .get(kind)
            .and_then(|d| lookup(d, "plan_duration"))
            .and_then(as_whole_number)
    };
    match (weeks(ArtifactKind::PlanConfig), weeks(ArtifactKind::Derived)) {
        (Some(plan), Some(derived)) if plan != derived => vec![Finding::critical(
            checks::CONFIG_DURATION_MISMATCH,
            ArtifactKind::PlanConfig.rel_path(),
            format!(
                "plan_config.yaml plan_duration={} but derived.yaml plan_duration={}",
                plan, derived
            ),
        )],
        _ => Vec::new(),
    }
}

/// One workout file per calendar day of the plan.
pub fn check_workout_count(ctx: GateContext<'_>) -> Vec<Finding> {
    let (Some(workouts), Some(weeks)) = (ctx.workouts, ctx.trusted_plan_weeks()) else {
        return Vec::new();
    };
    let expected = weeks as usize * ctx.rules.plan.days_per_week as usize;
    if workouts.len() >= expected {
        return Vec::new();
    }
    vec![Finding::critical(
        checks::ZWO_COUNT,
        WORKOUTS,
        format!(
            "Only {} ZWO files for a {}-week plan (expected >= {})",
            workouts.len(),
            weeks,
            expected
        ),
    )]
}

/// Each session category the plan depends on appears at least once.
pub fn check_categories(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(workouts) = ctx.workouts else {
        return Vec::new();
    };
    let required = [
        (SessionCategory::Strength, Severity::Critical, checks::ZWO_STRENGTH, "strength"),
        (SessionCategory::Rest, Severity::Critical, checks::ZWO_REST, "rest/off day"),
        (SessionCategory::ThresholdTest, Severity::High, checks::ZWO_FTP, "FTP test"),
        (SessionCategory::RaceDay, Severity::High, checks::ZWO_RACE_DAY, "race day"),
    ];
    required
        .into_iter()
        .filter(|(category, ..)| !workouts.iter().any(|w| w.is(*category)))
        .map(|(_, severity, check, label)| {
            Finding::new(severity, check, WORKOUTS, format!("No {} ZWO files found", label))
        })
        .collect()
}

/// Expected child elements and the file-name convention.
pub fn check_workout_structure(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(workouts) = ctx.workouts else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for file in workouts {
        if let Some(d) = &file.descriptor {
            for tag in &d.missing_elements {
                findings.push(Finding::high(
                    checks::ZWO_STRUCTURE,
                    file.artifact.as_str(),
                    format!("Missing <{}> element", tag),
                ));
            }
        }
        if !file.is(SessionCategory::RaceDay) && !FILE_NAME.is_match(&file.file_name) {
            findings.push(Finding::medium(
                checks::ZWO_FILENAME,
                file.artifact.as_str(),
                format!(
                    "File name '{}' does not follow W<nn>_<d><Day>_<Mon><dd>_<Type>.zwo",
                    file.file_name
                ),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::testing::{Fixture, zwo};
    use serde_json::json;

    fn twelve_weeks() -> Fixture {
        Fixture::new().with_config(
            ArtifactKind::Derived,
            json!({"tier": "compete", "plan_duration": 12}),
        )
    }

    fn with_files(mut fx: Fixture, n: usize) -> Fixture {
        for i in 0..n {
            let name = format!("W{:02}_{}Mon_Feb02_Endurance.zwo", i / 7 + 1, i % 7 + 1);
            fx = fx.with_workout(&name, &zwo("W01 Endurance Feb02", ""));
        }
        fx
    }

    #[test]
    fn count_is_calendar_days() {
        let short = with_files(twelve_weeks(), 83);
        let findings = check_workout_count(short.ctx());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].check, checks::ZWO_COUNT);
        assert!(findings[0].message.contains("Only 83"));

        let full = with_files(twelve_weeks(), 84);
        assert!(check_workout_count(full.ctx()).is_empty());
    }

    #[test]
    fn count_skipped_for_unsupported_duration() {
        let fx = Fixture::new().with_config(ArtifactKind::Derived, json!({"plan_duration": 13}));
        assert!(check_workout_count(with_files(fx, 3).ctx()).is_empty());
    }

    #[test]
    fn missing_categories_have_distinct_severities() {
        let fx = Fixture::new()
            .with_workout("W01_1Mon_Feb02_Strength_Base.zwo", &zwo("W01 Strength", ""))
            .with_workout("W01_2Tue_Feb03_Endurance.zwo", &zwo("W01 Endurance", ""));
        let findings = check_categories(fx.ctx());
        let checks_found: Vec<_> = findings.iter().map(|f| (f.check, f.severity)).collect();
        assert_eq!(
            checks_found,
            vec![
                (checks::ZWO_REST, Severity::Critical),
                (checks::ZWO_FTP, Severity::High),
                (checks::ZWO_RACE_DAY, Severity::High),
            ]
        );
    }

    #[test]
    fn required_keys_named_individually() {
        let fx = Fixture::new()
            .with_config(ArtifactKind::PlanConfig, json!({"template_key": "x"}))
            .with_config(
                ArtifactKind::Methodology,
                json!({"athlete_summary": "", "why_this_plan": "", "template_selection": "",
                       "periodization": {}, "scaling": {}, "accommodations": {},
                       "weekly_structure": {}, "key_workouts_per_phase": {}}),
            );
        let findings = check_required_sections(fx.ctx());
        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Missing section 'plan_duration' in plan_config.yaml",
                "Missing section 'periodization.recovery_weeks' in methodology.json",
            ]
        );
        assert!(findings.iter().all(|f| f.severity == Severity::Critical));
    }

    #[test]
    fn non_mapping_config_is_one_finding() {
        let fx = Fixture::new().with_config(ArtifactKind::Profile, json!(["a", "b"]));
        let findings = check_required_sections(fx.ctx());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].artifact, "profile.yaml");
    }

    #[test]
    fn plan_duration_must_agree() {
        let fx = twelve_weeks().with_config(ArtifactKind::PlanConfig, json!({"plan_duration": 16}));
        let findings = check_config_consistency(fx.ctx());
        assert_eq!(findings[0].check, checks::CONFIG_DURATION_MISMATCH);

        let fx = twelve_weeks().with_config(ArtifactKind::PlanConfig, json!({"plan_duration": "12"}));
        assert!(check_config_consistency(fx.ctx()).is_empty());
    }

    #[test]
    fn structure_and_file_name_advisories() {
        let bare = "<workout_file><name>W01 Tempo Feb03</name><workout/></workout_file>";
        let fx = Fixture::new()
            .with_workout("W01_2Tue_Feb03_Tempo.zwo", bare)
            .with_workout("tempo_day.zwo", &zwo("Tempo Feb03", ""))
            .with_workout("W12_Apr25_Race_Day.zwo", &zwo("Race Day", ""));
        let findings = check_workout_structure(fx.ctx());

        let structure: Vec<_> = findings
            .iter()
            .filter(|f| f.check == checks::ZWO_STRUCTURE)
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(
            structure,
            vec![
                "Missing <description> element",
                "Missing <sportType> element",
                "Missing <tags> element",
            ]
        );
        let names: Vec<_> = findings
            .iter()
            .filter(|f| f.check == checks::ZWO_FILENAME)
            .map(|f| f.artifact.as_str())
            .collect();
        assert_eq!(names, vec!["workouts/tempo_day.zwo"]);
    }

    #[test]
    fn missing_workout_directory_skips_workout_checks() {
        let mut fx = twelve_weeks();
        fx.workouts = None;
        assert!(check_workout_count(fx.ctx()).is_empty());
        assert!(check_categories(fx.ctx()).is_empty());
    }
}
