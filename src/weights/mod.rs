pub mod aggregate;
pub mod units;

pub use aggregate::{aggregate_weights, CategoryWeight, LabelWeight, WeightSummary};
pub use units::WeightUnit;
