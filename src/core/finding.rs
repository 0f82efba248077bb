//! Findings: the only thing a gate is allowed to produce.
//!
//! A finding is immutable once built. Gates append findings to a sink; nothing
//! ever edits or removes one.

use serde::Serialize;
use std::fmt;

/// Severity taxonomy. Ordering is meaningful: `Critical > High > Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL_DESC: [Severity; 3] = [Severity::Critical, Severity::High, Severity::Medium];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable check identifiers. Reports aggregate on these, so they never change
/// once released.
pub mod checks {
    pub const FILE_EXISTS: &str = "FILE_EXISTS";
    pub const CONFIG_PARSE: &str = "CONFIG_PARSE";
    pub const CONFIG_SECTION: &str = "CONFIG_SECTION";
    pub const CONFIG_DURATION_MISMATCH: &str = "CONFIG_DURATION_MISMATCH";
    pub const DERIVED_DURATION: &str = "DERIVED_DURATION";
    pub const DERIVED_TIER: &str = "DERIVED_TIER";
    pub const DERIVED_RACE: &str = "DERIVED_RACE";

    pub const ZWO_COUNT: &str = "ZWO_COUNT";
    pub const ZWO_STRENGTH: &str = "ZWO_STRENGTH";
    pub const ZWO_REST: &str = "ZWO_REST";
    pub const ZWO_FTP: &str = "ZWO_FTP";
    pub const ZWO_RACE_DAY: &str = "ZWO_RACE_DAY";
    pub const ZWO_XML: &str = "ZWO_XML";
    pub const ZWO_ROOT: &str = "ZWO_ROOT";
    pub const ZWO_STRUCTURE: &str = "ZWO_STRUCTURE";
    pub const ZWO_FILENAME: &str = "ZWO_FILENAME";
    pub const ZWO_DATE_IN_NAME: &str = "ZWO_DATE_IN_NAME";
    pub const ZWO_NAME_CHARS: &str = "ZWO_NAME_CHARS";
    pub const ZWO_POWER: &str = "ZWO_POWER";
    pub const ZWO_POWER_RANGE: &str = "ZWO_POWER_RANGE";
    pub const ZWO_POWER_UNITS: &str = "ZWO_POWER_UNITS";
    pub const ZWO_POWER_LOW: &str = "ZWO_POWER_LOW";
    pub const ZWO_DURATION: &str = "ZWO_DURATION";
    pub const ZWO_DURATION_SHORT: &str = "ZWO_DURATION_SHORT";
    pub const ZWO_FREERIDE_ZERO: &str = "ZWO_FREERIDE_ZERO";
    pub const ZWO_REPEAT: &str = "ZWO_REPEAT";
    pub const RECOVERY_POWER: &str = "RECOVERY_POWER";
    pub const RECOVERY_DURATION: &str = "RECOVERY_DURATION";

    pub const INJURY_FILTER: &str = "INJURY_FILTER";
    pub const INJURY_ANNOTATION: &str = "INJURY_ANNOTATION";
    pub const GI_NUTRITION: &str = "GI_NUTRITION";

    pub const GUIDE_SIZE: &str = "GUIDE_SIZE";
    pub const GUIDE_PLACEHOLDERS: &str = "GUIDE_PLACEHOLDERS";
    pub const GUIDE_NULLS: &str = "GUIDE_NULLS";
    pub const GUIDE_SECTIONS: &str = "GUIDE_SECTIONS";
    pub const GUIDE_TOC_BODY_MISMATCH: &str = "GUIDE_TOC_BODY_MISMATCH";
    pub const GUIDE_TOC_DUPLICATE: &str = "GUIDE_TOC_DUPLICATE";
    pub const GUIDE_SECTION_IDS: &str = "GUIDE_SECTION_IDS";
    pub const GUIDE_SECTION_ORDER: &str = "GUIDE_SECTION_ORDER";
    pub const GUIDE_RACE_NAME: &str = "GUIDE_RACE_NAME";
    pub const GUIDE_DISTANCE: &str = "GUIDE_DISTANCE";
    pub const GUIDE_METHODOLOGY: &str = "GUIDE_METHODOLOGY";

    pub const PDF_SIZE: &str = "PDF_SIZE";
    pub const TOUCHPOINTS: &str = "TOUCHPOINTS";
    pub const EMAIL_TEMPLATE: &str = "EMAIL_TEMPLATE";
    pub const EMAIL_PLACEHOLDER: &str = "EMAIL_PLACEHOLDER";
}

/// One validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub check: &'static str,
    pub message: String,
    /// Artifact path relative to the package root (`workouts/W01_...zwo`).
    pub artifact: String,
}

impl Finding {
    pub fn new(
        severity: Severity,
        check: &'static str,
        artifact: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            check,
            message: message.into(),
            artifact: artifact.into(),
        }
    }

    pub fn critical(
        check: &'static str,
        artifact: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Critical, check, artifact, message)
    }

    pub fn high(check: &'static str, artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::High, check, artifact, message)
    }

    pub fn medium(
        check: &'static str,
        artifact: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Medium, check, artifact, message)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {} ({})", self.severity, self.check, self.message, self.artifact)
    }
}
