//! Gate orchestration.
//!
//! `validate_package` is a pure read of one package directory: locate the
//! artifacts, parse what is there, run every gate family in a fixed order and
//! collect the findings into a report. It never writes to the package and
//! shares no state between runs, so two runs over an unchanged package give
//! identical reports.

use crate::core::error::GateError;
use crate::core::finding::{Finding, checks};
use crate::core::output;
use crate::core::package::{self, ArtifactKind, ConfigSet, DeliveryPackage};
use crate::core::report::{BatchReport, Policy, ValidationReport};
use crate::core::rules::RuleBook;
use crate::core::workout::{self, WorkoutFile};
use crate::gates::{self, GateContext};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn run_gate(report: &mut ValidationReport, name: &str, findings: Vec<Finding>) {
    debug!(gate = name, findings = findings.len(), "gate finished");
    report.extend(findings);
}

/// Validate one package rooted at `root`.
pub fn validate_package(
    root: &Path,
    rules: &RuleBook,
    policy: Policy,
) -> Result<ValidationReport, GateError> {
    if !root.is_dir() {
        return Err(GateError::NotFound(root.to_path_buf()));
    }
    let artifacts = package::locate(root);
    let mut parse_findings = Vec::new();
    let configs = ConfigSet::load(&artifacts, &mut parse_findings);
    let pkg = DeliveryPackage::from_configs(root, &configs);
    info!(package = %pkg.athlete_id, "validating package");

    let mut report = ValidationReport::new(pkg.athlete_id.clone(), root, policy);
    run_gate(&mut report, "artifact_presence", artifacts.missing_findings());
    run_gate(&mut report, "config_parse", parse_findings);

    let workouts = match artifacts.existing(ArtifactKind::Workouts) {
        Some(dir) => {
            let (files, findings) = load_workout_set(dir, root, rules);
            run_gate(&mut report, "workout_parse", findings);
            files
        }
        None => None,
    };

    let ctx = GateContext {
        rules,
        artifacts: &artifacts,
        configs: &configs,
        package: &pkg,
        workouts: workouts.as_deref(),
    };

    run_gate(&mut report, "derived_parameters", gates::guide::check_derived_parameters(ctx));
    run_gate(&mut report, "required_sections", gates::structural::check_required_sections(ctx));
    run_gate(&mut report, "config_consistency", gates::structural::check_config_consistency(ctx));
    run_gate(&mut report, "workout_count", gates::structural::check_workout_count(ctx));
    run_gate(&mut report, "categories", gates::structural::check_categories(ctx));
    run_gate(&mut report, "workout_structure", gates::structural::check_workout_structure(ctx));
    run_gate(&mut report, "segments", gates::numeric::check_segments(ctx));
    run_gate(&mut report, "naming", gates::numeric::check_naming(ctx));
    run_gate(&mut report, "recovery_ceiling", gates::numeric::check_recovery_ceiling(ctx));
    run_gate(&mut report, "accommodations", gates::accommodation::check(ctx));
    run_gate(&mut report, "guide", gates::guide::check(ctx));
    run_gate(&mut report, "pdf", gates::delivery::check_pdf(ctx));
    run_gate(&mut report, "touchpoints", gates::delivery::check_touchpoints(ctx));
    run_gate(&mut report, "email_templates", gates::delivery::check_email_templates(ctx));

    info!(
        package = %report.package,
        findings = report.findings.len(),
        blocking = report.blocking_count(),
        passed = report.passed(),
        "package validated"
    );
    Ok(report)
}

/// Parse the workout directory. A directory that cannot be listed becomes a
/// CRITICAL finding and the workout gates see no files.
fn load_workout_set(
    dir: &Path,
    root: &Path,
    rules: &RuleBook,
) -> (Option<Vec<WorkoutFile>>, Vec<Finding>) {
    let mut findings = Vec::new();
    match workout::load_workouts(dir, root, &rules.workouts, &mut findings) {
        Ok(files) => {
            debug!(files = files.len(), "workouts loaded");
            (Some(files), findings)
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "workouts directory unreadable");
            findings.push(Finding::critical(
                checks::FILE_EXISTS,
                ArtifactKind::Workouts.rel_path(),
                format!("Cannot read workouts/ directory: {}", e),
            ));
            (None, findings)
        }
    }
}

/// Validate one package inside a batch. A package that cannot be validated at
/// all is reported as blocked so its siblings still run.
fn validate_member(dir: &Path, rules: &RuleBook, policy: Policy) -> ValidationReport {
    validate_package(dir, rules, policy).unwrap_or_else(|e| {
        warn!(package = %dir.display(), error = %e, "package could not be validated");
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        let mut report = ValidationReport::new(name, dir, policy);
        report.extend([Finding::critical(
            checks::FILE_EXISTS,
            ".",
            format!("Package could not be validated: {}", e),
        )]);
        report
    })
}

/// Immediate child directories of `parent`, sorted by name.
pub fn package_dirs(parent: &Path) -> Result<Vec<PathBuf>, GateError> {
    if !parent.is_dir() {
        return Err(GateError::NotFound(parent.to_path_buf()));
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(parent)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Validate every package directory directly under `parent`.
pub fn validate_batch(
    parent: &Path,
    rules: &RuleBook,
    policy: Policy,
) -> Result<BatchReport, GateError> {
    let dirs = package_dirs(parent)?;
    if dirs.is_empty() {
        warn!(parent = %parent.display(), "no package directories found");
    }
    let reports = dirs
        .iter()
        .map(|dir| validate_member(dir, rules, policy))
        .collect();
    Ok(BatchReport { reports })
}

/// Turn a finished report into the gate verdict: `ValidationError` when the
/// policy blocks release.
pub fn run_validation(report: &ValidationReport) -> Result<(), GateError> {
    if report.passed() {
        return Ok(());
    }
    let blocking: Vec<String> = report
        .findings
        .iter()
        .filter(|f| report.policy.blocks(f.severity))
        .map(Finding::to_string)
        .collect();
    Err(GateError::ValidationError(format!(
        "{}: {} blocking finding(s): {}",
        report.package,
        blocking.len(),
        output::message_preview(&blocking, 2, 110)
    )))
}
