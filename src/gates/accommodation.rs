//! Accommodation gate.
//!
//! Intake text activates restriction categories by keyword. Each active
//! category then forbids its exercise and fueling strings in the sessions it
//! governs. A disclaimer elsewhere in a file never excuses a forbidden string.

use super::GateContext;
use crate::core::finding::{Finding, checks};
use crate::core::package::{ArtifactKind, lookup};
use crate::core::rules::{AccommodationRules, RestrictionCategory};
use crate::core::workout::SessionCategory;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// A restriction category switched on by intake text.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRestriction<'r> {
    pub category: &'r RestrictionCategory,
    /// The keyword that activated it.
    pub keyword: &'r str,
}

/// Restriction categories activated by the athlete's intake answers.
pub fn detect_restrictions<'r>(
    intake: &Value,
    rules: &'r AccommodationRules,
) -> Vec<ActiveRestriction<'r>> {
    let mut answers: Vec<String> = Vec::new();
    for field in &rules.intake_fields {
        match lookup(intake, field) {
            Some(Value::String(s)) => answers.push(s.to_lowercase()),
            Some(Value::Array(items)) => answers.extend(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase),
            ),
            _ => {}
        }
    }
    let text = answers
        .into_iter()
        .filter(|a| {
            let a = a.trim();
            !rules.none_values.iter().any(|n| n.eq_ignore_ascii_case(a))
        })
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return Vec::new();
    }

    rules
        .categories
        .iter()
        .filter_map(|category| {
            category
                .keywords
                .iter()
                .find(|k| text.contains(&k.to_lowercase()))
                .map(|k| ActiveRestriction {
                    category,
                    keyword: k.as_str(),
                })
        })
        .collect()
}

pub fn check(ctx: GateContext<'_>) -> Vec<Finding> {
    let (Some(intake), Some(workouts)) = (ctx.configs.get(ArtifactKind::Intake), ctx.workouts)
    else {
        return Vec::new();
    };
    let rules = &ctx.rules.accommodations;
    let active = detect_restrictions(intake, rules);
    if active.is_empty() {
        return Vec::new();
    }
    debug!(
        categories = ?active.iter().map(|a| a.category.name.as_str()).collect::<Vec<_>>(),
        "restrictions active"
    );

    let physical = active.iter().any(|a| a.category.restricts_strength());
    let annotation = rules.modification_annotation.to_lowercase();
    let mut findings = Vec::new();

    for file in workouts {
        let strength = file.is(SessionCategory::Strength);
        let fueled = file.is(SessionCategory::LongEndurance) || file.is(SessionCategory::RaceDay);
        if !strength && !fueled {
            continue;
        }
        let text = file.searchable_text();

        if strength {
            let mut reported = BTreeSet::new();
            for a in active.iter().filter(|a| a.category.restricts_strength()) {
                for exercise in &a.category.banned_exercises {
                    let needle = exercise.to_lowercase();
                    if text.contains(&needle) && reported.insert(needle) {
                        findings.push(Finding::critical(
                            checks::INJURY_FILTER,
                            file.artifact.as_str(),
                            format!(
                                "{} contains '{}' despite {} restriction (intake: '{}')",
                                file.file_name, exercise, a.category.name, a.keyword
                            ),
                        ));
                    }
                }
            }
            if physical && !text.contains(&annotation) {
                findings.push(Finding::critical(
                    checks::INJURY_ANNOTATION,
                    file.artifact.as_str(),
                    format!(
                        "{} lacks the '{}' annotation for an athlete with a physical restriction",
                        file.file_name, rules.modification_annotation
                    ),
                ));
            }
        }

        if fueled {
            for a in &active {
                for banned in &a.category.banned_nutrition {
                    if text.contains(&banned.to_lowercase()) {
                        findings.push(Finding::critical(
                            checks::GI_NUTRITION,
                            file.artifact.as_str(),
                            format!(
                                "{} still carries generic fueling '{}' despite {} restriction",
                                file.file_name, banned, a.category.name
                            ),
                        ));
                    }
                }
            }
        }
    }
    findings
}
