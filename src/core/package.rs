//! Artifact locator and the read-only view of a delivery package.
//!
//! The locator resolves the fixed artifact layout under a package root and
//! records what is present. Nothing here writes to the package.

use crate::core::error::GateError;
use crate::core::finding::{Finding, Severity, checks};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Every artifact the gate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Intake,
    Profile,
    Derived,
    WeeklyStructure,
    PlanConfig,
    Guide,
    Workouts,
    Methodology,
    Touchpoints,
    GuidePdf,
    EmailTemplates,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 11] = [
        Self::Intake,
        Self::Profile,
        Self::Derived,
        Self::WeeklyStructure,
        Self::PlanConfig,
        Self::Guide,
        Self::Workouts,
        Self::Methodology,
        Self::Touchpoints,
        Self::GuidePdf,
        Self::EmailTemplates,
    ];

    /// Config artifacts parsed into a document tree.
    pub const CONFIGS: [ArtifactKind; 7] = [
        Self::Intake,
        Self::Profile,
        Self::Derived,
        Self::WeeklyStructure,
        Self::PlanConfig,
        Self::Methodology,
        Self::Touchpoints,
    ];

    pub fn rel_path(self) -> &'static str {
        match self {
            Self::Intake => "intake.json",
            Self::Profile => "profile.yaml",
            Self::Derived => "derived.yaml",
            Self::WeeklyStructure => "weekly_structure.yaml",
            Self::PlanConfig => "plan_config.yaml",
            Self::Guide => "guide.html",
            Self::Workouts => "workouts",
            Self::Methodology => "methodology.json",
            Self::Touchpoints => "touchpoints.json",
            Self::GuidePdf => "guide.pdf",
            Self::EmailTemplates => "emails",
        }
    }

    pub fn is_dir(self) -> bool {
        matches!(self, Self::Workouts | Self::EmailTemplates)
    }

    /// Severity of the finding raised when this artifact is absent.
    pub fn missing_severity(self) -> Severity {
        match self {
            Self::Methodology | Self::Touchpoints | Self::EmailTemplates => Severity::High,
            Self::GuidePdf => Severity::Medium,
            _ => Severity::Critical,
        }
    }

    pub fn from_rel_path(rel: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.rel_path() == rel)
    }
}

#[derive(Debug, Clone)]
pub struct LocatedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub exists: bool,
}

/// Result of resolving the artifact layout under one package root.
#[derive(Debug, Clone)]
pub struct ArtifactMap {
    pub root: PathBuf,
    artifacts: Vec<LocatedArtifact>,
}

/// Resolve every expected artifact path under `root` and record presence.
pub fn locate(root: &Path) -> ArtifactMap {
    let artifacts = ArtifactKind::ALL
        .iter()
        .map(|&kind| {
            let path = root.join(kind.rel_path());
            let exists = if kind.is_dir() {
                path.is_dir()
            } else {
                path.is_file()
            };
            LocatedArtifact { kind, path, exists }
        })
        .collect();
    ArtifactMap {
        root: root.to_path_buf(),
        artifacts,
    }
}

impl ArtifactMap {
    pub fn get(&self, kind: ArtifactKind) -> &LocatedArtifact {
        // ALL covers every variant, so the lookup cannot miss.
        &self.artifacts[ArtifactKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default()]
    }

    pub fn existing(&self, kind: ArtifactKind) -> Option<&Path> {
        let a = self.get(kind);
        a.exists.then_some(a.path.as_path())
    }

    pub fn missing_findings(&self) -> Vec<Finding> {
        self.artifacts
            .iter()
            .filter(|a| !a.exists)
            .map(|a| {
                let rel = a.kind.rel_path();
                let what = if a.kind.is_dir() {
                    format!("Missing: {}/ directory", rel)
                } else {
                    format!("Missing: {}", rel)
                };
                Finding::new(a.kind.missing_severity(), checks::FILE_EXISTS, rel, what)
            })
            .collect()
    }
}

/// Read a config artifact into a document tree (YAML or JSON by extension).
pub fn load_config(path: &Path) -> Result<Value, GateError> {
    let content = fs::read_to_string(path)?;
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let value = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(value)
}

/// Parsed config artifacts, keyed by kind. Only artifacts that exist and
/// parsed cleanly are present.
#[derive(Debug, Default, Clone)]
pub struct ConfigSet {
    docs: BTreeMap<ArtifactKind, Value>,
}

impl ConfigSet {
    /// Load every present config artifact; parse failures become findings.
    pub fn load(map: &ArtifactMap, findings: &mut Vec<Finding>) -> Self {
        let mut docs = BTreeMap::new();
        for kind in ArtifactKind::CONFIGS {
            let Some(path) = map.existing(kind) else {
                continue;
            };
            match load_config(path) {
                Ok(value) => {
                    docs.insert(kind, value);
                }
                Err(e) => {
                    warn!(artifact = kind.rel_path(), error = %e, "config artifact unreadable");
                    findings.push(Finding::critical(
                        checks::CONFIG_PARSE,
                        kind.rel_path(),
                        format!("Cannot parse {}: {}", kind.rel_path(), e),
                    ));
                }
            }
        }
        Self { docs }
    }

    pub fn from_docs(docs: impl IntoIterator<Item = (ArtifactKind, Value)>) -> Self {
        Self {
            docs: docs.into_iter().collect(),
        }
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Value> {
        self.docs.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &Value)> {
        self.docs.iter().map(|(k, v)| (*k, v))
    }
}

/// Look up a dotted key path (`periodization.recovery_weeks`).
pub fn lookup<'a>(doc: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(doc, |node, key| node.as_object()?.get(key))
}

/// Read a whole number that may have been written as an integer, a float
/// with no fraction, or a numeric string.
pub fn as_whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The unit under test: identity and plan facts read from derived parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryPackage {
    pub root: PathBuf,
    pub athlete_id: String,
    pub plan_duration_weeks: Option<u32>,
    pub tier: Option<String>,
    pub race_name: Option<String>,
    pub race_distance: Option<f64>,
    pub race_date: Option<String>,
    pub recovery_weeks: BTreeSet<u32>,
}

impl DeliveryPackage {
    pub fn from_configs(root: &Path, configs: &ConfigSet) -> Self {
        let athlete_id = root
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("package")
            .to_string();
        let derived = configs.get(ArtifactKind::Derived);
        let field = |key: &str| derived.and_then(|d| lookup(d, key));
        let text = |key: &str| {
            field(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let recovery_source = field("recovery_weeks").or_else(|| {
            configs
                .get(ArtifactKind::Methodology)
                .and_then(|m| lookup(m, "periodization.recovery_weeks"))
        });
        let recovery_weeks = recovery_source
            .and_then(Value::as_array)
            .map(|weeks| {
                weeks
                    .iter()
                    .filter_map(as_whole_number)
                    .filter_map(|w| u32::try_from(w).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            root: root.to_path_buf(),
            athlete_id,
            plan_duration_weeks: field("plan_duration")
                .and_then(as_whole_number)
                .and_then(|w| u32::try_from(w).ok()),
            tier: text("tier"),
            race_name: text("race_name"),
            race_distance: field("race_distance_miles").and_then(as_number),
            race_date: text("race_date"),
            recovery_weeks,
        }
    }
}
