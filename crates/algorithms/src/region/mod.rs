//! Connected regions and region-level detection decisions

mod components;
mod decision;

pub use components::{label_components, BoundingBox, Component, ComponentLabels};
pub use decision::{
    coverage, decide_regions, MatchCleanup, RegionDecision, RegionDecisionMaker, RegionOutcome,
    RegionParams, DEFAULT_DECISION_THRESHOLD,
};
