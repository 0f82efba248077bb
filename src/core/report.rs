//! Validation report: ordered findings, a verdict, and renderers.

use crate::core::finding::{Finding, Severity};
use crate::core::output;
use colored::Colorize;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Which severities block release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Only CRITICAL blocks.
    #[default]
    Lenient,
    /// CRITICAL and HIGH block.
    Strict,
}

impl Policy {
    pub fn blocks(self, severity: Severity) -> bool {
        match self {
            Self::Lenient => severity == Severity::Critical,
            Self::Strict => severity >= Severity::High,
        }
    }
}

/// Findings for one package, in the order the gates produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub package: String,
    pub root: PathBuf,
    pub policy: Policy,
    pub findings: Vec<Finding>,
}

#[derive(Serialize)]
struct ReportView<'a> {
    package: &'a str,
    root: String,
    policy: Policy,
    passed: bool,
    critical: usize,
    high: usize,
    medium: usize,
    fingerprint: String,
    findings: &'a [Finding],
}

impl ValidationReport {
    pub fn new(package: impl Into<String>, root: impl Into<PathBuf>, policy: Policy) -> Self {
        Self {
            package: package.into(),
            root: root.into(),
            policy,
            findings: Vec::new(),
        }
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn passed(&self) -> bool {
        !self.findings.iter().any(|f| self.policy.blocks(f.severity))
    }

    pub fn blocking_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| self.policy.blocks(f.severity))
            .count()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    pub fn with_check<'a>(&'a self, check: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.check == check)
    }

    /// Digest of the ordered findings. Identical inputs give identical digests.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for f in &self.findings {
            hasher.update(f.severity.as_str().as_bytes());
            hasher.update(b"\0");
            hasher.update(f.check.as_bytes());
            hasher.update(b"\0");
            hasher.update(f.artifact.as_bytes());
            hasher.update(b"\0");
            hasher.update(f.message.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let view = ReportView {
            package: &self.package,
            root: self.root.display().to_string(),
            policy: self.policy,
            passed: self.passed(),
            critical: self.count(Severity::Critical),
            high: self.count(Severity::High),
            medium: self.count(Severity::Medium),
            fingerprint: self.fingerprint(),
            findings: &self.findings,
        };
        serde_json::to_value(view).unwrap_or(serde_json::Value::Null)
    }

    /// Severity-grouped listing followed by a count line and the verdict.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "DELIVERY GATE: {}", self.package.bold());
        let _ = writeln!(out, "{}", rule);

        for severity in Severity::ALL_DESC {
            let group: Vec<&Finding> = self.with_severity(severity).collect();
            if group.is_empty() {
                continue;
            }
            let heading = format!("{} ({})", severity, group.len());
            let heading = match severity {
                Severity::Critical => heading.bright_red().bold(),
                Severity::High => heading.bright_yellow().bold(),
                Severity::Medium => heading.cyan().bold(),
            };
            let _ = writeln!(out, "{}", heading);
            for f in group {
                let _ = writeln!(
                    out,
                    "  [{}] {} ({})",
                    f.check,
                    output::clip_line(&f.message, 160),
                    f.artifact
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(
            out,
            "TOTAL ISSUES: {} ({} critical, {} high, {} medium)",
            self.findings.len(),
            self.count(Severity::Critical),
            self.count(Severity::High),
            self.count(Severity::Medium)
        );
        let verdict = if self.passed() {
            "PASS: package may be released".bright_green().bold()
        } else {
            format!(
                "BLOCKED: {} blocking finding(s) under {:?} policy",
                self.blocking_count(),
                self.policy
            )
            .bright_red()
            .bold()
        };
        let _ = writeln!(out, "{}", verdict);
        out
    }
}

/// Reports for a batch run over sibling packages.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub reports: Vec<ValidationReport>,
}

impl BatchReport {
    pub fn passed(&self) -> bool {
        self.reports.iter().all(ValidationReport::passed)
    }

    pub fn blocked(&self) -> usize {
        self.reports.iter().filter(|r| !r.passed()).count()
    }

    pub fn summary_line(&self) -> String {
        let findings: usize = self.reports.iter().map(|r| r.findings.len()).sum();
        format!(
            "SUMMARY: {} packages, {} blocked, {} findings",
            self.reports.len(),
            self.blocked(),
            findings
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "passed": self.passed(),
            "packages": self.reports.len(),
            "blocked": self.blocked(),
            "reports": self.reports.iter().map(ValidationReport::to_json).collect::<Vec<_>>(),
        })
    }
}
