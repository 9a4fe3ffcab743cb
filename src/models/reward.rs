use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_AMOUNT: u64 = 50_000;
pub const DEFAULT_MAX_AMOUNT: u64 = 500_000;

/// User-configured bounds for the "lucky money" amount the model is asked to pick.
///
/// Ordering is not enforced; see [`RewardRange::is_ordered`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardRange {
    pub min: u64,
    pub max: u64,
}

impl Default for RewardRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_AMOUNT,
            max: DEFAULT_MAX_AMOUNT,
        }
    }
}

impl RewardRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}
