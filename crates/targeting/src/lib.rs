//! Targeting constraint validation: platform constraint registry, per-rule
//! and per-segment validation, reach/confidence estimation.

pub mod builder;
pub mod fingerprint;
pub mod reach;
pub mod registry;
pub mod rules;
pub mod segment;

pub use builder::SegmentBuilder;
pub use registry::{ConstraintRegistry, PlatformConstraints};
pub use rules::{RuleValidation, RuleValidator};
pub use segment::{SegmentReport, SegmentValidator, ValidationCache};
