pub mod equipment;
pub mod golden_joints;
pub mod instruments;
pub mod lines;
pub mod metadata;
pub mod packages;
pub mod rules;
