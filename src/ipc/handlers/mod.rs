pub mod assessment_types;
pub mod core;
pub mod overrides;
pub mod scale;
pub mod scores;
pub mod stats;
pub mod subjects;
