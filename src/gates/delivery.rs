//! Delivery extras: the rendered PDF, the touchpoint schedule and the email
//! templates that go out alongside the plan.

use super::GateContext;
use crate::core::finding::{Finding, checks};
use crate::core::output;
use crate::core::package::ArtifactKind;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::sync::LazyLock;
use tracing::warn;

static EMAIL_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("static regex"));

/// A present PDF must fall inside the expected size band.
pub fn check_pdf(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(path) = ctx.artifacts.existing(ArtifactKind::GuidePdf) else {
        return Vec::new();
    };
    let rules = &ctx.rules.delivery;
    let artifact = ArtifactKind::GuidePdf.rel_path();
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "pdf unreadable");
            return vec![Finding::high(
                checks::PDF_SIZE,
                artifact,
                format!("Cannot stat guide.pdf: {}", e),
            )];
        }
    };
    if size < rules.pdf_min_bytes {
        vec![Finding::high(
            checks::PDF_SIZE,
            artifact,
            format!("guide.pdf is {} bytes (minimum {})", size, rules.pdf_min_bytes),
        )]
    } else if size > rules.pdf_max_bytes {
        vec![Finding::medium(
            checks::PDF_SIZE,
            artifact,
            format!("guide.pdf is {} bytes (maximum {})", size, rules.pdf_max_bytes),
        )]
    } else {
        Vec::new()
    }
}

/// Number of scheduled touchpoints: either `{"touchpoints": [...]}` or a bare list.
pub fn touchpoint_count(doc: &Value) -> usize {
    doc.get("touchpoints")
        .unwrap_or(doc)
        .as_array()
        .map_or(0, Vec::len)
}

pub fn check_touchpoints(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(doc) = ctx.configs.get(ArtifactKind::Touchpoints) else {
        return Vec::new();
    };
    let count = touchpoint_count(doc);
    let min = ctx.rules.delivery.min_touchpoints;
    if count >= min {
        return Vec::new();
    }
    vec![Finding::high(
        checks::TOUCHPOINTS,
        ArtifactKind::Touchpoints.rel_path(),
        format!("Only {} touchpoints (need >= {})", count, min),
    )]
}

/// Placeholders left in `body` once the known variables are substituted.
pub fn unresolved_variables(body: &str, known: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    EMAIL_VARIABLE
        .captures_iter(body)
        .map(|c| c[1].to_string())
        .filter(|name| !known.contains(name))
        .filter(|name| seen.insert(name.clone()))
        .map(|name| format!("{{{}}}", name))
        .collect()
}

pub fn check_email_templates(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(dir) = ctx.artifacts.existing(ArtifactKind::EmailTemplates) else {
        return Vec::new();
    };
    let rules = &ctx.rules.delivery;
    let mut findings = Vec::new();
    for template in &rules.email_templates {
        let file = format!("{}.html", template);
        let artifact = format!("{}/{}", ArtifactKind::EmailTemplates.rel_path(), file);
        let body = match fs::read_to_string(dir.join(&file)) {
            Ok(body) => body,
            Err(e) => {
                let message = if e.kind() == io::ErrorKind::NotFound {
                    format!("{} missing", file)
                } else {
                    format!("{} unreadable ({})", file, e.kind())
                };
                findings.push(Finding::critical(checks::EMAIL_TEMPLATE, artifact, message));
                continue;
            }
        };
        let leftovers = unresolved_variables(&body, &rules.email_variables);
        if !leftovers.is_empty() {
            findings.push(Finding::critical(
                checks::EMAIL_PLACEHOLDER,
                artifact,
                format!(
                    "{} has unresolved placeholders: {}",
                    file,
                    output::quoted_list(&leftovers, 5)
                ),
            ));
        }
    }
    findings
}
