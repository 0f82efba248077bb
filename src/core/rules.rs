//! The gate's rule set, kept as data.
//!
//! Every threshold, closed set and keyword table the gates consult lives in a
//! [`RuleBook`]. Defaults are compiled in; `--rules <file>` overlays a TOML
//! document on top of them (any key left out keeps its default).

use crate::core::error::GateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Complete rule set handed to every gate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleBook {
    pub plan: PlanRules,
    pub workouts: WorkoutRules,
    pub recovery: RecoveryRules,
    pub guide: GuideRules,
    pub accommodations: AccommodationRules,
    pub delivery: DeliveryRules,
    pub config: Vec<RequiredKeys>,
}

/// Derived-parameter closed sets.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlanRules {
    pub supported_weeks: Vec<u32>,
    pub tiers: Vec<String>,
    pub days_per_week: u32,
    /// Tier label -> methodology name the guide must mention.
    pub methodology_names: BTreeMap<String, String>,
}

impl Default for PlanRules {
    fn default() -> Self {
        let methodology_names = [
            ("time_crunched", "hiit-focused"),
            ("finisher", "traditional pyramidal"),
            ("compete", "polarized"),
            ("podium", "high-volume polarized"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            supported_weeks: vec![6, 12, 16, 20],
            tiers: strings(&["time_crunched", "finisher", "compete", "podium"]),
            days_per_week: 7,
            methodology_names,
        }
    }
}

/// Structured workout format and per-segment bounds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkoutRules {
    pub extension: String,
    pub root_tag: String,
    pub required_elements: Vec<String>,
    pub intensity_min: f64,
    pub intensity_max: f64,
    /// In-range values above this are likely raw watts or percent.
    pub intensity_units_advisory: f64,
    /// In-range values below this are suspicious but allowed.
    pub intensity_low_advisory: f64,
    /// Durations under this many seconds look like minutes typed as seconds.
    pub short_duration_secs: i64,
}

impl Default for WorkoutRules {
    fn default() -> Self {
        Self {
            extension: "zwo".to_string(),
            root_tag: "workout_file".to_string(),
            required_elements: strings(&["name", "description", "sportType", "workout", "tags"]),
            intensity_min: 0.1,
            intensity_max: 2.0,
            intensity_units_advisory: 1.5,
            intensity_low_advisory: 0.3,
            short_duration_secs: 10,
        }
    }
}

/// Ceilings for weeks flagged as recovery. Both are inclusive.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryRules {
    pub max_intensity: f64,
    pub max_duration_secs: i64,
}

impl Default for RecoveryRules {
    fn default() -> Self {
        Self {
            max_intensity: 0.70,
            max_duration_secs: 5_400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GuideRules {
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub placeholder_report_cap: usize,
    pub null_tokens: Vec<String>,
    pub section_id_prefix: String,
    /// Ordered topics; matched case-insensitively against normalized text.
    pub required_sections: Vec<String>,
}

impl Default for GuideRules {
    fn default() -> Self {
        Self {
            min_bytes: 50_000,
            max_bytes: 500_000,
            placeholder_report_cap: 5,
            null_tokens: strings(&["undefined", "null", "None", "NaN"]),
            section_id_prefix: "section-".to_string(),
            required_sections: strings(&[
                "race profile",
                "non-negotiables",
                "training zones",
                "how adaptation works",
                "weekly structure",
                "phase progression",
                "week-by-week overview",
                "workout execution",
                "recovery protocol",
                "equipment checklist",
                "nutrition strategy",
                "mental preparation",
                "race week",
                "race day",
            ]),
        }
    }
}

/// One restriction category detected from intake text.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RestrictionCategory {
    pub name: String,
    /// Lowercase substrings that activate the category.
    pub keywords: Vec<String>,
    /// Exercise names that must not appear in strength sessions.
    #[serde(default)]
    pub banned_exercises: Vec<String>,
    /// Generic fueling text that must have been replaced in long and race-day sessions.
    #[serde(default)]
    pub banned_nutrition: Vec<String>,
}

impl RestrictionCategory {
    /// Physical restrictions change strength work; only those demand the
    /// modification annotation.
    pub fn restricts_strength(&self) -> bool {
        !self.banned_exercises.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccommodationRules {
    /// Intake fields scanned for restriction keywords (string or list of strings).
    pub intake_fields: Vec<String>,
    /// Values meaning "nothing reported".
    pub none_values: Vec<String>,
    pub modification_annotation: String,
    pub categories: Vec<RestrictionCategory>,
}

impl Default for AccommodationRules {
    fn default() -> Self {
        let category = |name: &str, keywords: &[&str], exercises: &[&str], nutrition: &[&str]| {
            RestrictionCategory {
                name: name.to_string(),
                keywords: strings(keywords),
                banned_exercises: strings(exercises),
                banned_nutrition: strings(nutrition),
            }
        };
        Self {
            intake_fields: strings(&["injuries", "dietary_restrictions", "medical_conditions"]),
            none_values: strings(&["", "na", "n/a", "none", "no", "nothing"]),
            modification_annotation: "EXERCISES MODIFIED".to_string(),
            categories: vec![
                category(
                    "knee",
                    &["knee", "chondromalacia", "patella", "acl", "mcl", "meniscus"],
                    &["BULGARIAN SPLIT SQUAT", "STEP-UPS", "Full depth"],
                    &[],
                ),
                category(
                    "back",
                    &["back", "spine", "lumbar", "herniat", "disc", "l4", "l5", "sciatica"],
                    &["ROMANIAN DEADLIFT", "FARMER'S CARRY"],
                    &[],
                ),
                category(
                    "hip",
                    &["hip resurfac", "hip replac", "labral", "hip impingement"],
                    &["Full depth"],
                    &[],
                ),
                category(
                    "gi",
                    &["reflux", "gerd", "acid", "gi issue", "gastro", "ibs", "crohn"],
                    &[],
                    &["60-80g carbs/hour"],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryRules {
    pub pdf_min_bytes: u64,
    pub pdf_max_bytes: u64,
    pub min_touchpoints: usize,
    pub email_templates: Vec<String>,
    /// Variables substituted before scanning templates for leftovers.
    pub email_variables: Vec<String>,
}

impl Default for DeliveryRules {
    fn default() -> Self {
        Self {
            pdf_min_bytes: 10_000,
            pdf_max_bytes: 20_000_000,
            min_touchpoints: 8,
            email_templates: strings(&[
                "week_1_welcome",
                "week_2_checkin",
                "first_recovery",
                "mid_plan",
                "build_phase_start",
                "race_month",
                "race_week",
                "race_day_morning",
                "post_race_3_days",
                "post_race_2_weeks",
            ]),
            email_variables: strings(&["athlete_name", "race_name", "race_date", "plan_duration"]),
        }
    }
}

/// Keys a config artifact must carry. Dotted paths address nested tables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RequiredKeys {
    pub artifact: String,
    pub keys: Vec<String>,
}

impl RuleBook {
    pub fn builtin() -> Self {
        let mut rules = Self::default();
        rules.config = default_required_keys();
        rules
    }

    /// Load the effective rule set: built-in defaults, overlaid with `path` if given.
    pub fn load(path: Option<&Path>) -> Result<Self, GateError> {
        let Some(path) = path else {
            return Ok(Self::builtin());
        };
        if !path.is_file() {
            return Err(GateError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, GateError> {
        let mut rules: RuleBook = toml::from_str(content)?;
        if rules.config.is_empty() {
            rules.config = default_required_keys();
        }
        rules.check()?;
        Ok(rules)
    }

    pub fn to_toml(&self) -> Result<String, GateError> {
        Ok(toml::to_string(self)?)
    }

    fn check(&self) -> Result<(), GateError> {
        let w = &self.workouts;
        if !(w.intensity_min < w.intensity_max) {
            return Err(GateError::RulesError(format!(
                "workouts.intensity_min ({}) must be below intensity_max ({})",
                w.intensity_min, w.intensity_max
            )));
        }
        if self.guide.min_bytes > self.guide.max_bytes {
            return Err(GateError::RulesError(format!(
                "guide.min_bytes ({}) exceeds guide.max_bytes ({})",
                self.guide.min_bytes, self.guide.max_bytes
            )));
        }
        if self.plan.days_per_week == 0 {
            return Err(GateError::RulesError("plan.days_per_week must be positive".into()));
        }
        for cat in &self.accommodations.categories {
            if cat.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(GateError::RulesError(format!(
                    "restriction category '{}' has an empty keyword",
                    cat.name
                )));
            }
        }
        Ok(())
    }
}

fn default_required_keys() -> Vec<RequiredKeys> {
    let req = |artifact: &str, keys: &[&str]| RequiredKeys {
        artifact: artifact.to_string(),
        keys: strings(keys),
    };
    vec![
        req("intake.json", &["name", "email"]),
        req("profile.yaml", &["primary_race", "fitness", "schedule", "health"]),
        req(
            "derived.yaml",
            &["tier", "level", "plan_duration", "race_name", "race_distance_miles"],
        ),
        req("weekly_structure.yaml", &["description", "tier", "days"]),
        req("plan_config.yaml", &["template_key", "plan_duration"]),
        req(
            "methodology.json",
            &[
                "athlete_summary",
                "why_this_plan",
                "template_selection",
                "periodization",
                "periodization.recovery_weeks",
                "scaling",
                "accommodations",
                "weekly_structure",
                "key_workouts_per_phase",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_round_trip_through_toml() {
        let rules = RuleBook::builtin();
        let text = rules.to_toml().unwrap();
        let back = RuleBook::from_toml(&text).unwrap();
        assert_eq!(rules, back);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let rules = RuleBook::from_toml("[guide]\nmin_bytes = 1000\n").unwrap();
        assert_eq!(rules.guide.min_bytes, 1000);
        assert_eq!(rules.guide.max_bytes, 500_000);
        assert_eq!(rules.recovery.max_duration_secs, 5_400);
        let plan_config = rules
            .config
            .iter()
            .find(|r| r.artifact == "plan_config.yaml")
            .unwrap();
        assert_eq!(plan_config.keys, ["template_key", "plan_duration"]);
    }

    #[test]
    fn inverted_intensity_bounds_are_rejected() {
        let err = RuleBook::from_toml("[workouts]\nintensity_min = 2.5\n").unwrap_err();
        assert!(matches!(err, GateError::RulesError(_)));
    }

    #[test]
    fn only_physical_categories_restrict_strength() {
        let rules = RuleBook::builtin();
        let names: Vec<_> = rules
            .accommodations
            .categories
            .iter()
            .filter(|c| c.restricts_strength())
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["knee", "back", "hip"]);
    }
}
