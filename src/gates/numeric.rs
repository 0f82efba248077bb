//! Numeric and range gates over parsed workout segments.
//!
//! The downstream workout importer drops or mangles segments it cannot
//! render, so every intensity, duration and repeat count is range checked
//! here. Findings for one segment never stop the checks on its siblings.

use super::GateContext;
use crate::core::finding::{Finding, checks};
use crate::core::workout::{SessionCategory, WorkoutFile};
use regex::Regex;
use std::sync::LazyLock;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("static regex"));
static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s?\d{1,2}\b")
        .expect("static regex")
});
static RACE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brace[\s_-]*day\b").expect("static regex"));

const NAME_SPECIAL_CHARS: &[char] = &['<', '>', '&', '\'', '"', '/', '\\', '|', '?', '*'];

/// Intensity, duration and repeat bounds for every segment of every file.
pub fn check_segments(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(workouts) = ctx.workouts else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for file in workouts {
        check_file_segments(ctx, file, &mut findings);
    }
    findings
}

fn check_file_segments(ctx: GateContext<'_>, file: &WorkoutFile, findings: &mut Vec<Finding>) {
    let Some(descriptor) = &file.descriptor else {
        return;
    };
    let rules = &ctx.rules.workouts;
    let artifact = file.artifact.as_str();

    for seg in &descriptor.segments {
        let at = format!("<{}> #{}", seg.kind, seg.index);

        for &(attr, value) in &seg.intensities {
            if value < rules.intensity_min || value > rules.intensity_max {
                findings.push(Finding::critical(
                    checks::ZWO_POWER_RANGE,
                    artifact,
                    format!(
                        "{}={} on {} outside [{}, {}]",
                        attr, value, at, rules.intensity_min, rules.intensity_max
                    ),
                ));
            } else if value > rules.intensity_units_advisory {
                findings.push(Finding::high(
                    checks::ZWO_POWER_UNITS,
                    artifact,
                    format!(
                        "{}={} on {} is above {}; check for watts or percent instead of FTP fraction",
                        attr, value, at, rules.intensity_units_advisory
                    ),
                ));
            } else if value < rules.intensity_low_advisory {
                findings.push(Finding::medium(
                    checks::ZWO_POWER_LOW,
                    artifact,
                    format!("{}={} on {} is unusually low", attr, value, at),
                ));
            }
        }

        for (attr, secs) in seg.durations() {
            if seg.is_free_form() && attr == "Duration" && secs == 0 {
                findings.push(Finding::critical(
                    checks::ZWO_FREERIDE_ZERO,
                    artifact,
                    format!("Zero-length free-form segment {} cannot be rendered", at),
                ));
            } else if secs <= 0 {
                findings.push(Finding::critical(
                    checks::ZWO_DURATION,
                    artifact,
                    format!("{}={} on {} must be positive", attr, secs, at),
                ));
            } else if secs < rules.short_duration_secs
                && !seg.kind.eq_ignore_ascii_case("SteadyState")
                && !(secs == 1 && file.is(SessionCategory::Rest))
            {
                findings.push(Finding::medium(
                    checks::ZWO_DURATION_SHORT,
                    artifact,
                    format!("{}={}s on {} looks like minutes written as seconds", attr, secs, at),
                ));
            }
        }

        if let Some(repeat) = seg.repeat.filter(|r| *r <= 0) {
            findings.push(Finding::critical(
                checks::ZWO_REPEAT,
                artifact,
                format!("Repeat={} on {} must be positive", repeat, at),
            ));
        }
    }
}

/// Workout names must carry a calendar date or a race-day marker, and no
/// characters the importer rejects.
pub fn check_naming(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(workouts) = ctx.workouts else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for file in workouts {
        let Some(descriptor) = &file.descriptor else {
            continue;
        };
        let name = descriptor.name.as_deref().unwrap_or_default();
        let dated = ISO_DATE.is_match(name) || MONTH_DAY.is_match(name) || RACE_DAY.is_match(name);
        if !dated {
            findings.push(Finding::high(
                checks::ZWO_DATE_IN_NAME,
                file.artifact.as_str(),
                format!("Workout name '{}' has no calendar date or race-day marker", name),
            ));
        }
        let bad: String = name.chars().filter(|c| NAME_SPECIAL_CHARS.contains(c)).collect();
        if !bad.is_empty() {
            findings.push(Finding::medium(
                checks::ZWO_NAME_CHARS,
                file.artifact.as_str(),
                format!("Workout name '{}' contains special characters '{}'", name, bad),
            ));
        }
    }
    findings
}

/// Recovery weeks cap intensity and effective duration. Both ceilings are
/// inclusive.
pub fn check_recovery_ceiling(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(workouts) = ctx.workouts else {
        return Vec::new();
    };
    let recovery_weeks = &ctx.package.recovery_weeks;
    if recovery_weeks.is_empty() {
        return Vec::new();
    }
    let ceiling = &ctx.rules.recovery;
    let mut findings = Vec::new();

    for file in workouts {
        let (Some(week), Some(descriptor)) = (file.week, &file.descriptor) else {
            continue;
        };
        if !recovery_weeks.contains(&week)
            || file.categories.iter().any(|c| c.exempt_from_recovery())
        {
            continue;
        }

        let over: Vec<f64> = descriptor
            .segments
            .iter()
            .flat_map(|s| s.intensities.iter().map(|(_, v)| *v))
            .filter(|v| *v > ceiling.max_intensity)
            .collect();
        if let Some(peak) = over.iter().copied().reduce(f64::max) {
            findings.push(Finding::critical(
                checks::RECOVERY_POWER,
                file.artifact.as_str(),
                format!(
                    "Recovery week {}: {} intensity value(s) above {} (peak {})",
                    week,
                    over.len(),
                    ceiling.max_intensity,
                    peak
                ),
            ));
        }

        let total = descriptor.total_duration_secs();
        if total > ceiling.max_duration_secs {
            findings.push(Finding::critical(
                checks::RECOVERY_DURATION,
                file.artifact.as_str(),
                format!(
                    "Recovery week {}: {}s total exceeds {}s ceiling",
                    week, total, ceiling.max_duration_secs
                ),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::finding::Severity;
    use crate::core::package::ArtifactKind;
    use crate::gates::testing::{Fixture, zwo};
    use serde_json::json;

    fn checks_of(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.check).collect()
    }

    #[test]
    fn intensity_bands() {
        let fx = Fixture::new().with_workout(
            "W01_2Tue_Feb03_Intervals.zwo",
            &zwo(
                "W01 Feb03",
                r#"<SteadyState Duration="600" Power="2.5"/>
                   <SteadyState Duration="600" Power="1.8"/>
                   <SteadyState Duration="600" Power="0.2"/>
                   <SteadyState Duration="600" Power="0.75"/>"#,
            ),
        );
        let findings = check_segments(fx.ctx());
        assert_eq!(
            checks_of(&findings),
            vec![checks::ZWO_POWER_RANGE, checks::ZWO_POWER_UNITS, checks::ZWO_POWER_LOW]
        );
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[1].severity, Severity::High);
        assert_eq!(findings[2].severity, Severity::Medium);
    }

    #[test]
    fn zero_free_ride_is_its_own_finding_and_siblings_still_checked() {
        let fx = Fixture::new().with_workout(
            "W01_3Wed_Feb04_Openers.zwo",
            &zwo(
                "W01 Feb04",
                r#"<FreeRide Duration="0"/>
                   <SteadyState Duration="-5" Power="0.6"/>
                   <SteadyState Duration="300" Power="0.6"/>"#,
            ),
        );
        let findings = check_segments(fx.ctx());
        assert_eq!(
            checks_of(&findings),
            vec![checks::ZWO_FREERIDE_ZERO, checks::ZWO_DURATION]
        );
        assert!(findings[1].message.contains("#2"));
    }

    #[test]
    fn repeat_and_short_duration() {
        let fx = Fixture::new()
            .with_workout(
                "W01_4Thu_Feb05_Vo2.zwo",
                &zwo(
                    "W01 Feb05",
                    r#"<IntervalsT Repeat="0" OnDuration="5" OffDuration="120" OnPower="1.1" OffPower="0.5"/>"#,
                ),
            )
            .with_workout(
                "W01_5Fri_Feb06_Rest_Day.zwo",
                &zwo("W01 Rest Feb06", r#"<FreeRide Duration="1"/>"#),
            );
        let findings = check_segments(fx.ctx());
        assert_eq!(
            checks_of(&findings),
            vec![checks::ZWO_DURATION_SHORT, checks::ZWO_REPEAT]
        );
    }

    #[test]
    fn names_need_a_date_or_race_marker() {
        let fx = Fixture::new()
            .with_workout("a.zwo", &zwo("W02 2Tue Feb10 - Tempo", ""))
            .with_workout("b.zwo", &zwo("Tempo 2026-02-10", ""))
            .with_workout("c.zwo", &zwo("Race Day - Unbound", ""))
            .with_workout("d.zwo", &zwo("Tempo ride", ""))
            .with_workout("e.zwo", &zwo("Feb10 Over/Unders?", ""))
            .with_workout("f.zwo", &zwo("Marathon 5 pace", ""))
            .with_workout("g.zwo", &zwo("Separate 2 efforts", ""))
            .with_workout("h.zwo", &zwo("Tempo September 14", ""));
        let findings = check_naming(fx.ctx());
        let got: Vec<_> = findings.iter().map(|f| (f.check, f.artifact.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (checks::ZWO_DATE_IN_NAME, "workouts/d.zwo"),
                (checks::ZWO_NAME_CHARS, "workouts/e.zwo"),
                (checks::ZWO_DATE_IN_NAME, "workouts/f.zwo"),
                (checks::ZWO_DATE_IN_NAME, "workouts/g.zwo"),
            ]
        );
    }

    fn recovery_fixture(segments: &str) -> Fixture {
        Fixture::new()
            .with_config(
                ArtifactKind::Derived,
                json!({"plan_duration": 12, "recovery_weeks": [4, 8]}),
            )
            .with_workout("W04_3Wed_Mar04_Endurance.zwo", &zwo("W04 Mar04", segments))
    }

    #[test]
    fn recovery_ceilings_are_inclusive() {
        let fx = recovery_fixture(r#"<SteadyState Duration="5400" Power="0.70"/>"#);
        assert!(check_recovery_ceiling(fx.ctx()).is_empty());

        let fx = recovery_fixture(r#"<SteadyState Duration="5401" Power="0.71"/>"#);
        let findings = check_recovery_ceiling(fx.ctx());
        assert_eq!(
            checks_of(&findings),
            vec![checks::RECOVERY_POWER, checks::RECOVERY_DURATION]
        );
        assert!(findings.iter().all(|f| f.artifact == "workouts/W04_3Wed_Mar04_Endurance.zwo"));
    }

    #[test]
    fn recovery_duration_counts_repeats() {
        let fx = recovery_fixture(
            r#"<IntervalsT Repeat="10" OnDuration="300" OffDuration="300" OnPower="0.6" OffPower="0.5"/>"#,
        );
        let findings = check_recovery_ceiling(fx.ctx());
        assert_eq!(checks_of(&findings), vec![checks::RECOVERY_DURATION]);
        assert!(findings[0].message.contains("6000s"));
    }

    #[test]
    fn overflowing_repeat_is_over_the_duration_ceiling() {
        let fx = recovery_fixture(
            r#"<IntervalsT Repeat="9223372036854775807" OnDuration="300" OffDuration="300" OnPower="0.6" OffPower="0.5"/>"#,
        );
        let findings = check_recovery_ceiling(fx.ctx());
        assert_eq!(checks_of(&findings), vec![checks::RECOVERY_DURATION]);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].message.contains(&i64::MAX.to_string()));
    }

    #[test]
    fn exempt_sessions_and_other_weeks_pass() {
        let hard = r#"<SteadyState Duration="9000" Power="1.0"/>"#;
        let fx = recovery_fixture(hard)
            .with_workout("W04_1Mon_Mar02_Strength.zwo", &zwo("W04 Strength Mar02", hard))
            .with_workout("W04_4Thu_Mar05_FTP_Test.zwo", &zwo("W04 FTP Test Mar05", hard))
            .with_workout("W05_3Wed_Mar11_Endurance.zwo", &zwo("W05 Mar11", hard));
        let findings = check_recovery_ceiling(fx.ctx());
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.artifact.contains("W04_3Wed")));
    }
}
