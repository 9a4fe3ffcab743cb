use serde::{Deserialize, Serialize};

/// The five-field fortune returned by the model.
///
/// `lucky_money` is already formatted by the model (e.g. `"68.000đ"`) and is
/// shown verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub title: String,
    pub description: String,
    pub lucky_money: String,
    pub advice: String,
    pub strength: String,
}

impl PredictionResult {
    /// Names of the fields that are empty or whitespace only.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("luckyMoney", &self.lucky_money),
            ("advice", &self.advice),
            ("strength", &self.strength),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}
