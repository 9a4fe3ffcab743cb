pub mod prediction;
pub mod reward;

pub use prediction::PredictionResult;
pub use reward::RewardRange;
