//! Workout descriptor parser.
//!
//! Reads one structured workout file into a [`WorkoutDescriptor`]. A file that
//! is not well-formed, or whose root is not the expected tag, yields a single
//! CRITICAL finding instead of a descriptor. Attribute values that fail to
//! parse are reported as findings too, and parsing carries on with the rest of
//! the document.

use crate::core::finding::{Finding, checks};
use crate::core::rules::WorkoutRules;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const INTENSITY_ATTRS: [&str; 5] = ["Power", "PowerLow", "PowerHigh", "OnPower", "OffPower"];
pub const DURATION_ATTRS: [&str; 3] = ["Duration", "OnDuration", "OffDuration"];
pub const REPEAT_ATTR: &str = "Repeat";

static WEEK_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[Ww](\d{1,2})(?:\b|_)").expect("static regex"));

/// One atomic timed block.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Element tag (`SteadyState`, `IntervalsT`, `FreeRide`, ...).
    pub kind: String,
    /// Position among the segments of this workout, from 1.
    pub index: usize,
    pub intensities: Vec<(&'static str, f64)>,
    pub duration_secs: Option<i64>,
    pub on_duration_secs: Option<i64>,
    pub off_duration_secs: Option<i64>,
    pub repeat: Option<i64>,
    /// Product of the repeat counts of enclosing blocks.
    pub outer_repeat: i64,
}

impl Segment {
    pub fn is_free_form(&self) -> bool {
        self.kind.eq_ignore_ascii_case("FreeRide") || self.kind.eq_ignore_ascii_case("FreeRun")
    }

    pub fn durations(&self) -> impl Iterator<Item = (&'static str, i64)> + '_ {
        DURATION_ATTRS
            .iter()
            .zip([
                self.duration_secs,
                self.on_duration_secs,
                self.off_duration_secs,
            ])
            .filter_map(|(attr, v)| v.map(|v| (*attr, v)))
    }

    /// Wall-clock seconds this segment contributes, repeats included.
    /// Saturates at `i64::MAX` rather than wrapping.
    pub fn effective_duration_secs(&self) -> i64 {
        let own = self.duration_secs.unwrap_or(0).max(0);
        let on_off = self
            .on_duration_secs
            .unwrap_or(0)
            .max(0)
            .saturating_add(self.off_duration_secs.unwrap_or(0).max(0));
        let reps = self.repeat.unwrap_or(1).max(0);
        self.outer_repeat
            .max(0)
            .saturating_mul(own.saturating_add(reps.saturating_mul(on_off)))
    }
}

/// Normalized parse of one workout file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkoutDescriptor {
    pub name: Option<String>,
    pub sport_type: Option<String>,
    pub description: String,
    pub segments: Vec<Segment>,
    pub tags: BTreeSet<String>,
    /// On-screen coaching messages attached to segments.
    pub text_cues: Vec<String>,
    /// Expected top-level elements that were absent.
    pub missing_elements: Vec<String>,
}

impl WorkoutDescriptor {
    pub fn total_duration_secs(&self) -> i64 {
        self.segments
            .iter()
            .map(Segment::effective_duration_secs)
            .fold(0, i64::saturating_add)
    }
}

/// Session categories the structural and accommodation gates care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionCategory {
    Strength,
    Rest,
    ThresholdTest,
    RaceDay,
    LongEndurance,
}

impl SessionCategory {
    /// Sessions that are never held to recovery-week ceilings.
    pub fn exempt_from_recovery(self) -> bool {
        !matches!(self, Self::LongEndurance)
    }
}

/// A workout file as found on disk, with its parse (if it parsed).
#[derive(Debug, Clone)]
pub struct WorkoutFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Path relative to the package root, used in findings.
    pub artifact: String,
    pub raw: String,
    pub descriptor: Option<WorkoutDescriptor>,
    pub categories: BTreeSet<SessionCategory>,
    pub week: Option<u32>,
}

impl WorkoutFile {
    /// Parse `raw` and classify the session. Parse problems go to `findings`.
    pub fn from_source(
        path: PathBuf,
        artifact: String,
        raw: String,
        rules: &WorkoutRules,
        findings: &mut Vec<Finding>,
    ) -> Self {
        let descriptor = match parse_workout(&raw, &artifact, rules) {
            Ok((d, mut parse_findings)) => {
                findings.append(&mut parse_findings);
                Some(d)
            }
            Err(f) => {
                findings.push(f);
                None
            }
        };
        let file_name = file_name_of(&path);
        let categories = classify(&file_name, descriptor.as_ref());
        let week = week_number(&file_name, descriptor.as_ref());
        Self {
            path,
            file_name,
            artifact,
            raw,
            descriptor,
            categories,
            week,
        }
    }

    fn unparsed(path: PathBuf, file_name: String, artifact: String) -> Self {
        let categories = classify(&file_name, None);
        let week = week_number(&file_name, None);
        Self {
            path,
            file_name,
            artifact,
            raw: String::new(),
            descriptor: None,
            categories,
            week,
        }
    }

    pub fn is(&self, category: SessionCategory) -> bool {
        self.categories.contains(&category)
    }

    /// Text an accommodation check should search: raw bytes plus decoded
    /// element text, so escaped characters cannot hide a match.
    pub fn searchable_text(&self) -> String {
        let mut text = self.raw.clone();
        if let Some(d) = &self.descriptor {
            for part in d
                .name
                .iter()
                .chain(std::iter::once(&d.description))
                .chain(d.text_cues.iter())
            {
                text.push('\n');
                text.push_str(part);
            }
        }
        text.to_lowercase()
    }
}

/// Parse a workout document. `artifact` names the file in findings.
pub fn parse_workout(
    text: &str,
    artifact: &str,
    rules: &WorkoutRules,
) -> Result<(WorkoutDescriptor, Vec<Finding>), Finding> {
    let doc = roxmltree::Document::parse(text).map_err(|e| {
        Finding::critical(checks::ZWO_XML, artifact, format!("Invalid XML: {}", e))
    })?;
    let root = doc.root_element();
    if root.tag_name().name() != rules.root_tag {
        return Err(Finding::critical(
            checks::ZWO_ROOT,
            artifact,
            format!(
                "Root tag is <{}>, must be <{}>",
                root.tag_name().name(),
                rules.root_tag
            ),
        ));
    }

    let child = |tag: &str| {
        root.children()
            .find(|n| n.is_element() && n.tag_name().name() == tag)
    };
    let text_of = |node: roxmltree::Node| {
        node.descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect::<String>()
            .trim()
            .to_string()
    };

    let mut descriptor = WorkoutDescriptor {
        name: child("name").map(text_of),
        sport_type: child("sportType").map(text_of).filter(|s| !s.is_empty()),
        description: child("description").map(text_of).unwrap_or_default(),
        ..Default::default()
    };
    descriptor.missing_elements = rules
        .required_elements
        .iter()
        .filter(|tag| child(tag.as_str()).is_none())
        .cloned()
        .collect();

    if let Some(tags) = child("tags") {
        for tag in tags.descendants().filter(|n| n.is_element() && *n != tags) {
            let label = tag
                .attribute("name")
                .map(str::to_string)
                .unwrap_or_else(|| text_of(tag));
            if !label.is_empty() {
                descriptor.tags.insert(label);
            }
        }
    }

    let mut findings = Vec::new();
    if let Some(workout) = child("workout") {
        walk_segments(workout, 1, artifact, &mut descriptor, &mut findings);
    }
    Ok((descriptor, findings))
}

fn walk_segments(
    parent: roxmltree::Node,
    outer_repeat: i64,
    artifact: &str,
    descriptor: &mut WorkoutDescriptor,
    findings: &mut Vec<Finding>,
) {
    for node in parent.children().filter(|n| n.is_element()) {
        let kind = node.tag_name().name();
        if kind.eq_ignore_ascii_case("textevent") {
            if let Some(msg) = node.attribute("message") {
                descriptor.text_cues.push(msg.to_string());
            }
            continue;
        }

        let carries_numbers = INTENSITY_ATTRS
            .iter()
            .chain(DURATION_ATTRS.iter())
            .chain(std::iter::once(&REPEAT_ATTR))
            .any(|a| node.attribute(*a).is_some());

        let mut inner_repeat = outer_repeat;
        if carries_numbers {
            let index = descriptor.segments.len() + 1;
            let segment = read_segment(node, kind, index, outer_repeat, artifact, findings);
            // Children of a repeat container run once per repetition.
            if segment.on_duration_secs.is_none() && segment.off_duration_secs.is_none() {
                if let Some(r) = segment.repeat {
                    inner_repeat = outer_repeat.saturating_mul(r.max(0));
                }
            }
            descriptor.segments.push(segment);
        }
        walk_segments(node, inner_repeat, artifact, descriptor, findings);
    }
}

fn read_segment(
    node: roxmltree::Node,
    kind: &str,
    index: usize,
    outer_repeat: i64,
    artifact: &str,
    findings: &mut Vec<Finding>,
) -> Segment {
    let mut intensities = Vec::new();
    for attr in INTENSITY_ATTRS {
        let Some(raw) = node.attribute(attr) else {
            continue;
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => intensities.push((attr, v)),
            _ => findings.push(Finding::critical(
                checks::ZWO_POWER,
                artifact,
                format!("Non-numeric {}=\"{}\" on <{}> #{}", attr, raw, kind, index),
            )),
        }
    }

    let mut int_attr = |attr: &str, check: &'static str| -> Option<i64> {
        let raw = node.attribute(attr)?;
        match raw.trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => {
                findings.push(Finding::critical(
                    check,
                    artifact,
                    format!("Non-integer {}=\"{}\" on <{}> #{}", attr, raw, kind, index),
                ));
                None
            }
        }
    };

    Segment {
        kind: kind.to_string(),
        index,
        intensities,
        duration_secs: int_attr("Duration", checks::ZWO_DURATION),
        on_duration_secs: int_attr("OnDuration", checks::ZWO_DURATION),
        off_duration_secs: int_attr("OffDuration", checks::ZWO_DURATION),
        repeat: int_attr(REPEAT_ATTR, checks::ZWO_REPEAT),
        outer_repeat,
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Lowercased words of a label, space padded, so phrase checks can use
/// `" word "` without matching inside other words.
fn label_words(label: &str) -> String {
    let words: Vec<String> = label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    format!(" {} ", words.join(" "))
}

/// Derive categories from the file name, workout name and tags.
pub fn classify(file_name: &str, descriptor: Option<&WorkoutDescriptor>) -> BTreeSet<SessionCategory> {
    let mut label = file_name.to_string();
    if let Some(d) = descriptor {
        if let Some(name) = &d.name {
            label.push(' ');
            label.push_str(name);
        }
        for tag in &d.tags {
            label.push(' ');
            label.push_str(tag);
        }
    }
    let words = label_words(&label);
    let has = |w: &str| words.contains(&format!(" {} ", w));

    let mut out = BTreeSet::new();
    if has("strength") {
        out.insert(SessionCategory::Strength);
    }
    if has("rest") || has("off") {
        out.insert(SessionCategory::Rest);
    }
    if has("ftp") || has("threshold test") {
        out.insert(SessionCategory::ThresholdTest);
    }
    if has("race day") || has("raceday") {
        out.insert(SessionCategory::RaceDay);
    }
    if has("endurance") {
        out.insert(SessionCategory::LongEndurance);
    }
    out
}

/// Week number from a `W07_...` file name or a `W07 ...` workout name.
pub fn week_number(file_name: &str, descriptor: Option<&WorkoutDescriptor>) -> Option<u32> {
    let from = |s: &str| {
        WEEK_PREFIX
            .captures(s.trim())
            .and_then(|c| c[1].parse().ok())
    };
    from(file_name).or_else(|| descriptor.and_then(|d| d.name.as_deref()).and_then(from))
}

/// List and parse every workout file directly inside `dir`, sorted by name.
/// Files that fail to read or parse still appear (without a descriptor); the
/// failure is appended to `findings`.
pub fn load_workouts(
    dir: &Path,
    root: &Path,
    rules: &WorkoutRules,
    findings: &mut Vec<Finding>,
) -> std::io::Result<Vec<WorkoutFile>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&rules.extension))
        })
        .collect();
    paths.sort();

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = file_name_of(&path);
        let artifact = path
            .strip_prefix(root)
            .unwrap_or(path.as_path())
            .to_string_lossy()
            .replace('\\', "/");

        let raw = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                findings.push(Finding::critical(
                    checks::ZWO_XML,
                    artifact.as_str(),
                    format!("Unreadable workout file: {}", e),
                ));
                out.push(WorkoutFile::unparsed(path, file_name, artifact));
                continue;
            }
        };
        out.push(WorkoutFile::from_source(path, artifact, raw, rules, findings));
    }
    Ok(out)
}
