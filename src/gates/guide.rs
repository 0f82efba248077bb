//! Guide consistency gate.
//!
//! The rendered guide is the primary deliverable. These checks look for the
//! signatures of truncated or mismatched generation: size outliers, template
//! leftovers, missing topics, broken in-document navigation, and facts that
//! disagree with the derived parameters.

use super::GateContext;
use crate::core::finding::{Finding, checks};
use crate::core::package::{ArtifactKind, as_number, as_whole_number, lookup};
use crate::core::rules::{GuideRules, RuleBook};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::LazyLock;
use tracing::warn;

const GUIDE: &str = "guide.html";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{.*?\}\}").expect("static regex"));
static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("static regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("static regex"));

/// The guide in the three forms the checks need.
#[derive(Debug, Clone)]
pub struct GuideText<'a> {
    pub raw: &'a str,
    /// Visible text: scripts, styles and tags removed, entities decoded,
    /// whitespace collapsed.
    pub visible: String,
    /// `visible`, lowercased.
    pub normalized: String,
}

impl<'a> GuideText<'a> {
    pub fn new(raw: &'a str) -> Self {
        let stripped = SCRIPT_OR_STYLE.replace_all(raw, " ");
        let stripped = TAG.replace_all(&stripped, " ");
        let decoded = decode_entities(&stripped);
        let visible = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized = visible.to_lowercase();
        Self {
            raw,
            visible,
            normalized,
        }
    }

    fn contains_literal(&self, needle: &str) -> bool {
        self.raw.contains(needle) || self.visible.contains(needle)
    }
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => body
                    .strip_prefix("#x")
                    .or_else(|| body.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16).ok())
                    .unwrap_or_else(|| body.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Plan duration and tier must come from their closed sets. A key that is
/// absent is left to the required-section check.
pub fn check_derived_parameters(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(derived) = ctx.configs.get(ArtifactKind::Derived) else {
        return Vec::new();
    };
    let plan = &ctx.rules.plan;
    let artifact = ArtifactKind::Derived.rel_path();
    let mut findings = Vec::new();

    if let Some(value) = lookup(derived, "plan_duration") {
        let supported = as_whole_number(value)
            .and_then(|w| u32::try_from(w).ok())
            .is_some_and(|w| plan.supported_weeks.contains(&w));
        if !supported {
            findings.push(Finding::critical(
                checks::DERIVED_DURATION,
                artifact,
                format!(
                    "plan_duration {} is not a supported week count {:?}",
                    value, plan.supported_weeks
                ),
            ));
        }
    }
    if let Some(value) = lookup(derived, "tier") {
        let known = value
            .as_str()
            .is_some_and(|t| plan.tiers.iter().any(|k| k == t.trim()));
        if !known {
            findings.push(Finding::critical(
                checks::DERIVED_TIER,
                artifact,
                format!("tier {} is not one of {:?}", value, plan.tiers),
            ));
        }
    }
    // The fact checks below search for these literally; a value they cannot
    // use would otherwise skip the check.
    if let Some(value) = lookup(derived, "race_name") {
        if !value.as_str().is_some_and(|s| !s.trim().is_empty()) {
            findings.push(Finding::critical(
                checks::DERIVED_RACE,
                artifact,
                format!("race_name {} is not a non-empty string", value),
            ));
        }
    }
    if let Some(value) = lookup(derived, "race_distance_miles") {
        if !as_number(value).is_some_and(|d| d.is_finite() && d > 0.0) {
            findings.push(Finding::critical(
                checks::DERIVED_RACE,
                artifact,
                format!("race_distance_miles {} is not a positive number", value),
            ));
        }
    }
    findings
}

/// Read the guide and run every text check on it.
pub fn check(ctx: GateContext<'_>) -> Vec<Finding> {
    let Some(path) = ctx.artifacts.existing(ArtifactKind::Guide) else {
        return Vec::new();
    };
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "guide unreadable");
            return vec![Finding::critical(
                checks::FILE_EXISTS,
                GUIDE,
                format!("Cannot read guide.html: {}", e),
            )];
        }
    };
    let html = String::from_utf8_lossy(&bytes);
    check_document(ctx, &html, bytes.len() as u64)
}

/// Text checks over an already loaded guide of `size` bytes.
pub fn check_document(ctx: GateContext<'_>, html: &str, size: u64) -> Vec<Finding> {
    let rules = &ctx.rules.guide;
    let guide = GuideText::new(html);
    let mut findings = check_size(rules, size);
    findings.extend(check_placeholders(rules, &guide));
    findings.extend(check_nulls(rules, &guide));
    findings.extend(check_sections(rules, &guide));
    findings.extend(check_toc(rules, html));
    findings.extend(check_facts(ctx, &guide));
    findings
}

pub fn check_size(rules: &GuideRules, size: u64) -> Vec<Finding> {
    if size < rules.min_bytes {
        vec![Finding::critical(
            checks::GUIDE_SIZE,
            GUIDE,
            format!(
                "guide.html is {} bytes, below the {} byte floor (truncated generation?)",
                size, rules.min_bytes
            ),
        )]
    } else if size > rules.max_bytes {
        vec![Finding::high(
            checks::GUIDE_SIZE,
            GUIDE,
            format!(
                "guide.html is {} bytes, above the {} byte ceiling (duplicated content?)",
                size, rules.max_bytes
            ),
        )]
    } else {
        Vec::new()
    }
}

fn check_placeholders(rules: &GuideRules, guide: &GuideText<'_>) -> Vec<Finding> {
    let hits: Vec<&str> = PLACEHOLDER.find_iter(guide.raw).map(|m| m.as_str()).collect();
    let mut findings: Vec<Finding> = hits
        .iter()
        .take(rules.placeholder_report_cap)
        .map(|p| {
            Finding::critical(
                checks::GUIDE_PLACEHOLDERS,
                GUIDE,
                format!("Unresolved placeholder '{}'", p),
            )
        })
        .collect();
    if hits.len() > rules.placeholder_report_cap {
        findings.push(Finding::critical(
            checks::GUIDE_PLACEHOLDERS,
            GUIDE,
            format!(
                "{} more unresolved placeholder(s) not listed",
                hits.len() - rules.placeholder_report_cap
            ),
        ));
    }
    findings
}

fn check_nulls(rules: &GuideRules, guide: &GuideText<'_>) -> Vec<Finding> {
    rules
        .null_tokens
        .iter()
        .filter_map(|token| {
            let pattern = format!(r"(?i)>\s*{}\s*<", regex::escape(token));
            let re = match Regex::new(&pattern) {
                Ok(re) => re,
                Err(e) => {
                    warn!(token = %token, error = %e, "null token pattern rejected");
                    return None;
                }
            };
            let count = re.find_iter(guide.raw).count();
            (count > 0).then(|| {
                Finding::critical(
                    checks::GUIDE_NULLS,
                    GUIDE,
                    format!("'{}' rendered as visible text {} time(s)", token, count),
                )
            })
        })
        .collect()
}

fn check_sections(rules: &GuideRules, guide: &GuideText<'_>) -> Vec<Finding> {
    rules
        .required_sections
        .iter()
        .filter(|section| !guide.normalized.contains(&section.to_lowercase()))
        .map(|section| {
            Finding::critical(
                checks::GUIDE_SECTIONS,
                GUIDE,
                format!("Missing required section: {}", section),
            )
        })
        .collect()
}

/// Navigation links and heading ids must match one to one, and heading
/// numbers must run 1..=N without gaps.
pub fn check_toc(rules: &GuideRules, html: &str) -> Vec<Finding> {
    let prefix = regex::escape(&rules.section_id_prefix);
    let (links_re, headings_re) = match (
        Regex::new(&format!(r#"href\s*=\s*["']#({}(\d+))["']"#, prefix)),
        Regex::new(&format!(
            r#"<(?:section|h[1-6])\b[^>]*\bid\s*=\s*["']({}(\d+))["']"#,
            prefix
        )),
    ) {
        (Ok(l), Ok(h)) => (l, h),
        (Err(e), _) | (_, Err(e)) => {
            warn!(prefix = %rules.section_id_prefix, error = %e, "section id pattern rejected");
            return Vec::new();
        }
    };
    let number = |caps: &regex::Captures| caps[2].parse::<u32>().unwrap_or(0);

    let links: BTreeSet<(u32, String)> = links_re
        .captures_iter(html)
        .map(|c| (number(&c), c[1].to_string()))
        .collect();
    let headings_in_order: Vec<(u32, String)> = headings_re
        .captures_iter(html)
        .map(|c| (number(&c), c[1].to_string()))
        .collect();

    let mut findings = Vec::new();
    let mut seen: BTreeMap<&(u32, String), usize> = BTreeMap::new();
    for h in &headings_in_order {
        *seen.entry(h).or_default() += 1;
    }
    for ((_, id), count) in seen.iter().filter(|(_, c)| **c > 1) {
        findings.push(Finding::critical(
            checks::GUIDE_TOC_DUPLICATE,
            GUIDE,
            format!("Heading id #{} appears {} times", id, count),
        ));
    }

    let headings: BTreeSet<(u32, String)> = headings_in_order.iter().cloned().collect();
    for (_, id) in links.difference(&headings) {
        findings.push(Finding::critical(
            checks::GUIDE_TOC_BODY_MISMATCH,
            GUIDE,
            format!("TOC links to #{} but no heading has that id", id),
        ));
    }
    for (_, id) in headings.difference(&links) {
        findings.push(Finding::critical(
            checks::GUIDE_TOC_BODY_MISMATCH,
            GUIDE,
            format!("Heading #{} has no TOC entry", id),
        ));
    }

    let numbers: BTreeSet<u32> = headings.iter().map(|(n, _)| *n).collect();
    if let Some(&max) = numbers.last() {
        let prefix = &rules.section_id_prefix;
        let mut expected = 1u32;
        for &n in &numbers {
            if n > expected {
                let skipped = if n - expected == 1 {
                    format!("{}{}", prefix, expected)
                } else {
                    format!("{}{}..{}{}", prefix, expected, prefix, n - 1)
                };
                findings.push(Finding::critical(
                    checks::GUIDE_SECTION_IDS,
                    GUIDE,
                    format!("Section ids skip {} (headings run to {}{})", skipped, prefix, max),
                ));
            }
            expected = expected.max(n.saturating_add(1));
        }
    }

    let ordered = headings_in_order.windows(2).all(|w| w[0].0 < w[1].0);
    if !ordered && findings.iter().all(|f| f.check != checks::GUIDE_TOC_DUPLICATE) {
        findings.push(Finding::high(
            checks::GUIDE_SECTION_ORDER,
            GUIDE,
            "Section headings are not in ascending id order",
        ));
    }
    findings
}

fn check_facts(ctx: GateContext<'_>, guide: &GuideText<'_>) -> Vec<Finding> {
    let pkg = ctx.package;
    let mut findings = Vec::new();

    if let Some(name) = &pkg.race_name {
        if !guide.contains_literal(name) {
            findings.push(Finding::critical(
                checks::GUIDE_RACE_NAME,
                GUIDE,
                format!("Race name '{}' does not appear in the guide", name),
            ));
        }
    }
    if let Some(distance) = pkg.race_distance {
        let literal = if distance.fract() == 0.0 {
            format!("{}", distance as i64)
        } else {
            format!("{}", distance)
        };
        if !guide.contains_literal(&literal) {
            findings.push(Finding::critical(
                checks::GUIDE_DISTANCE,
                GUIDE,
                format!("Race distance {} does not appear in the guide", literal),
            ));
        }
    }
    if let Some(methodology) = methodology_for(ctx.rules, pkg.tier.as_deref()) {
        if !guide.normalized.contains(&methodology.to_lowercase()) {
            findings.push(Finding::critical(
                checks::GUIDE_METHODOLOGY,
                GUIDE,
                format!(
                    "Methodology '{}' for tier '{}' is not named in the guide",
                    methodology,
                    pkg.tier.as_deref().unwrap_or_default()
                ),
            ));
        }
    }
    findings
}

/// Methodology name for a supported tier. Unknown tiers map to nothing; the
/// derived-parameter check already reports them.
pub fn methodology_for<'r>(rules: &'r RuleBook, tier: Option<&str>) -> Option<&'r str> {
    let tier = tier?;
    if !rules.plan.tiers.iter().any(|t| t == tier) {
        return None;
    }
    rules.plan.methodology_names.get(tier).map(String::as_str)
}
