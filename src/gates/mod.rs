//! Validator families.
//!
//! Every gate is a pure function from a [`GateContext`] to the findings it
//! raises. Gates share no state and never touch the package on disk beyond
//! what the context already loaded (the guide gate reads the guide itself).

pub mod accommodation;
pub mod delivery;
pub mod guide;
pub mod numeric;
pub mod structural;

use crate::core::package::{ArtifactMap, ConfigSet, DeliveryPackage};
use crate::core::rules::RuleBook;
use crate::core::workout::WorkoutFile;

/// Read-only inputs shared by every gate for one package.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub rules: &'a RuleBook,
    pub artifacts: &'a ArtifactMap,
    pub configs: &'a ConfigSet,
    pub package: &'a DeliveryPackage,
    /// `None` when the workout directory is missing.
    pub workouts: Option<&'a [WorkoutFile]>,
}

impl GateContext<'_> {
    /// Plan length, but only when it is one of the supported week counts.
    /// Checks that scale with the plan skip when this is `None`.
    pub fn trusted_plan_weeks(&self) -> Option<u32> {
        self.package
            .plan_duration_weeks
            .filter(|w| self.rules.plan.supported_weeks.contains(w))
    }
}
