//! Foundation types and the gate orchestrator.
//!
//! Everything a gate needs to read a package lives here: the artifact
//! locator, config and workout parsers, the rule book, findings and reports.

pub mod error;
pub mod finding;
pub mod output;
pub mod package;
pub mod report;
pub mod rules;
pub mod telemetry;
pub mod validate;
pub mod workout;
