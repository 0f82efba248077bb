//! Delivery package fixtures shared by the integration tests.
//!
//! `PackageBuilder` writes a fully compliant package; tests then break one
//! thing and check that exactly that thing is reported.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const SECTIONS: [&str; 14] = [
    "Race Profile",
    "Non-Negotiables",
    "Training Zones",
    "How Adaptation Works",
    "Weekly Structure",
    "Phase Progression",
    "Week-by-Week Overview",
    "Workout Execution",
    "Recovery Protocol",
    "Equipment Checklist",
    "Nutrition Strategy",
    "Mental Preparation",
    "Race Week",
    "Race Day",
];

pub const EMAIL_TEMPLATES: [&str; 10] = [
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
];

const MONTHS: [(&str, u32); 12] = [
    ("Jan", 31),
    ("Feb", 28),
    ("Mar", 31),
    ("Apr", 30),
    ("May", 31),
    ("Jun", 30),
    ("Jul", 31),
    ("Aug", 31),
    ("Sep", 30),
    ("Oct", 31),
    ("Nov", 30),
    ("Dec", 31),
];
const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// `Feb02`-style label for the day `offset` days after Monday 2 February 2026.
pub fn date_label(offset: u32) -> String {
    let (mut month, mut day) = (1usize, 2 + offset);
    while day > MONTHS[month].1 {
        day -= MONTHS[month].1;
        month = (month + 1) % 12;
    }
    format!("{}{:02}", MONTHS[month].0, day)
}

pub fn workout_xml(name: &str, description: &str, segments: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<workout_file>
    <author>Coach</author>
    <name>{}</name>
    <description>{}</description>
    <sportType>bike</sportType>
    <tags><tag name="plan"/></tags>
    <workout>
        {}
    </workout>
</workout_file>
"#,
        name, description, segments
    )
}

#[derive(Debug, Clone)]
pub struct PackageBuilder {
    pub athlete: String,
    pub weeks: u32,
    pub tier: String,
    pub race_name: String,
    pub race_distance: u32,
    pub recovery_weeks: Vec<u32>,
    pub injuries: String,
    pub medical_conditions: String,
    pub guide_bytes: usize,
    pub long_ride_fueling: String,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self {
            athlete: "jane-doe-20260214".to_string(),
            weeks: 12,
            tier: "compete".to_string(),
            race_name: "Unbound Gravel".to_string(),
            race_distance: 200,
            recovery_weeks: vec![4, 8],
            injuries: "none".to_string(),
            medical_conditions: "none".to_string(),
            guide_bytes: 120_000,
            long_ride_fueling: "Fuel early and often".to_string(),
        }
    }
}

impl PackageBuilder {
    pub fn weeks(mut self, weeks: u32) -> Self {
        self.weeks = weeks;
        self.recovery_weeks = (1..weeks).filter(|w| w % 4 == 0).collect();
        self
    }

    /// Write the package into a fresh temp dir; returns the dir guard and the package root.
    pub fn build(&self) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().expect("tmpdir");
        let root = self.build_in(tmp.path());
        (tmp, root)
    }

    /// Write the package as `<parent>/<athlete>`.
    pub fn build_in(&self, parent: &Path) -> PathBuf {
        let root = parent.join(&self.athlete);
        fs::create_dir_all(root.join("workouts")).expect("mkdir workouts");
        fs::create_dir_all(root.join("emails")).expect("mkdir emails");
        self.write_configs(&root);
        self.write_workouts(&root);
        fs::write(root.join("guide.html"), self.guide()).expect("write guide");
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.resize(20_000, b' ');
        fs::write(root.join("guide.pdf"), pdf).expect("write pdf");
        for template in EMAIL_TEMPLATES {
            fs::write(
                root.join("emails").join(format!("{}.html", template)),
                "<p>Hi {athlete_name}, {race_name} is on {race_date}. Week {plan_duration}.</p>",
            )
            .expect("write email");
        }
        root
    }

    fn write_configs(&self, root: &Path) {
        let write = |name: &str, body: String| fs::write(root.join(name), body).expect("write config");
        let recovery = format!("{:?}", self.recovery_weeks);

        write(
            "intake.json",
            serde_json::json!({
                "name": "Jane Doe",
                "email": "jane@example.com",
                "injuries": self.injuries,
                "dietary_restrictions": "none",
                "medical_conditions": self.medical_conditions,
            })
            .to_string(),
        );
        write(
            "profile.yaml",
            format!(
                "primary_race:\n  name: {}\n  date: 2026-05-30\nfitness:\n  ftp: 250\nschedule:\n  hours_per_week: 10\nhealth:\n  injuries: {}\n",
                self.race_name, self.injuries
            ),
        );
        write(
            "derived.yaml",
            format!(
                "tier: {}\nlevel: intermediate\nplan_duration: {}\nrace_name: {}\nrace_distance_miles: {}\nrace_date: 2026-05-30\nrecovery_weeks: {}\n",
                self.tier, self.weeks, self.race_name, self.race_distance, recovery
            ),
        );
        write(
            "weekly_structure.yaml",
            format!(
                "description: Seven day rhythm\ntier: {}\ndays:\n  monday: strength\n  friday: rest\n",
                self.tier
            ),
        );
        write(
            "plan_config.yaml",
            format!("template_key: {}_{}w\nplan_duration: {}\n", self.tier, self.weeks, self.weeks),
        );
        write(
            "methodology.json",
            serde_json::json!({
                "athlete_summary": "Jane",
                "why_this_plan": "Fits the schedule",
                "template_selection": {"key": self.tier},
                "periodization": {"recovery_weeks": self.recovery_weeks},
                "scaling": {},
                "accommodations": {},
                "weekly_structure": {},
                "key_workouts_per_phase": {},
            })
            .to_string(),
        );
        let touchpoints: Vec<_> = EMAIL_TEMPLATES
            .iter()
            .map(|id| serde_json::json!({"id": id, "template": id}))
            .collect();
        write(
            "touchpoints.json",
            serde_json::json!({ "touchpoints": touchpoints }).to_string(),
        );
    }

    /// (file name, xml) for every calendar day of the plan.
    pub fn workouts(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for week in 1..=self.weeks {
            let recovery = self.recovery_weeks.contains(&week);
            for day in 1..=7u32 {
                let date = date_label((week - 1) * 7 + day - 1);
                let dow = DAYS[day as usize - 1];
                let prefix = format!("W{:02}_{}{}_{}", week, day, dow, date);
                let name = |label: &str| format!("W{:02} {}{} {} - {}", week, day, dow, date, label);

                let (file, xml) = match (day, recovery) {
                    (7, _) if week == self.weeks => (
                        format!("{}_Race_Day.zwo", prefix),
                        workout_xml(
                            &format!("Race Day - {}", self.race_name),
                            "Execute the plan",
                            r#"<FreeRide Duration="36000"/>"#,
                        ),
                    ),
                    (1, _) => (
                        format!("{}_Strength_Base.zwo", prefix),
                        workout_xml(
                            &name("Strength Base"),
                            "EXERCISES MODIFIED: goblet squat 3x10, glute bridge 3x12",
                            r#"<SteadyState Duration="1800" Power="0.55"/>"#,
                        ),
                    ),
                    (5, _) => (
                        format!("{}_Rest_Day.zwo", prefix),
                        workout_xml(&name("Rest Day"), "Off the bike", r#"<FreeRide Duration="1"/>"#),
                    ),
                    (4, _) if week == 1 => (
                        format!("{}_FTP_Test.zwo", prefix),
                        workout_xml(
                            &name("FTP Test"),
                            "20 minute test",
                            r#"<Warmup Duration="900" PowerLow="0.45" PowerHigh="0.75"/>
        <SteadyState Duration="1200" Power="1.05"/>
        <Cooldown Duration="600" PowerLow="0.6" PowerHigh="0.4"/>"#,
                        ),
                    ),
                    (6, false) => (
                        format!("{}_Long_Endurance.zwo", prefix),
                        workout_xml(
                            &name("Long Endurance"),
                            &self.long_ride_fueling,
                            r#"<SteadyState Duration="10800" Power="0.65"/>"#,
                        ),
                    ),
                    (6, true) => (
                        format!("{}_Long_Endurance.zwo", prefix),
                        workout_xml(
                            &name("Long Endurance"),
                            &self.long_ride_fueling,
                            r#"<SteadyState Duration="5400" Power="0.65"/>"#,
                        ),
                    ),
                    (2 | 3, true) => (
                        format!("{}_Recovery_Spin.zwo", prefix),
                        workout_xml(
                            &name("Recovery Spin"),
                            "Easy spin",
                            r#"<SteadyState Duration="2400" Power="0.6"/>"#,
                        ),
                    ),
                    (2, false) => (
                        format!("{}_Intervals.zwo", prefix),
                        workout_xml(
                            &name("Intervals"),
                            "Threshold repeats",
                            r#"<Warmup Duration="600" PowerLow="0.5" PowerHigh="0.7"/>
        <IntervalsT Repeat="4" OnDuration="300" OffDuration="180" OnPower="0.95" OffPower="0.55"/>
        <Cooldown Duration="600" PowerLow="0.6" PowerHigh="0.4"/>"#,
                        ),
                    ),
                    (3, false) => (
                        format!("{}_Tempo.zwo", prefix),
                        workout_xml(
                            &name("Tempo"),
                            "Steady tempo",
                            r#"<SteadyState Duration="3600" Power="0.8"/>"#,
                        ),
                    ),
                    _ => (
                        format!("{}_Endurance.zwo", prefix),
                        workout_xml(
                            &name("Endurance"),
                            "Zone 2",
                            r#"<SteadyState Duration="3600" Power="0.62"/>"#,
                        ),
                    ),
                };
                out.push((file, xml));
            }
        }
        out
    }

    fn write_workouts(&self, root: &Path) {
        for (file, xml) in self.workouts() {
            fs::write(root.join("workouts").join(file), xml).expect("write workout");
        }
    }

    /// Compliant guide padded to exactly `guide_bytes` bytes.
    pub fn guide(&self) -> String {
        guide_html(self, &(1..=SECTIONS.len() as u32).collect::<Vec<_>>(), self.guide_bytes)
    }
}

/// Guide whose body carries headings `section-<n>` for each of `heading_ids`
/// (the TOC always links all 14), padded to `bytes`.
pub fn guide_html(builder: &PackageBuilder, heading_ids: &[u32], bytes: usize) -> String {
    let methodology = match builder.tier.as_str() {
        "time_crunched" => "HIIT-focused",
        "finisher" => "traditional pyramidal",
        "podium" => "high-volume polarized",
        _ => "polarized",
    };
    let mut html = String::from("<!DOCTYPE html>\n<html><head><title>Training Guide</title>");
    html.push_str("<style>body { font-family: sans-serif; }</style></head><body>\n");
    html.push_str(&format!(
        "<h1>{}: {} miles</h1>\n<p>Your {}-week plan follows a {} approach.</p>\n<nav>\n",
        builder.race_name, builder.race_distance, builder.weeks, methodology
    ));
    for (i, title) in SECTIONS.iter().enumerate() {
        html.push_str(&format!("<a href=\"#section-{}\">{}</a>\n", i + 1, title));
    }
    html.push_str("</nav>\n");
    for (i, title) in SECTIONS.iter().enumerate() {
        let n = i as u32 + 1;
        if heading_ids.contains(&n) {
            html.push_str(&format!("<section id=\"section-{}\"><h2>{}</h2>\n", n, title));
        } else {
            html.push_str(&format!("<section><h2>{}</h2>\n", title));
        }
        html.push_str("<p>Ride steady, keep cadence smooth and log every session.</p></section>\n");
    }
    for extra in heading_ids.iter().filter(|n| **n as usize > SECTIONS.len()) {
        html.push_str(&format!(
            "<section id=\"section-{}\"><h2>Appendix</h2></section>\n",
            extra
        ));
    }
    let tail = "</body></html>\n";
    let filler = "<p>Consistency beats heroics. Sleep, fuel and show up for the next session.</p>\n";
    while html.len() + filler.len() + tail.len() <= bytes {
        html.push_str(filler);
    }
    while html.len() + tail.len() < bytes {
        html.push(' ');
    }
    html.push_str(tail);
    html
}

pub fn run_gate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_delivery-gate"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run delivery-gate")
}

pub fn combined_output(output: &Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
