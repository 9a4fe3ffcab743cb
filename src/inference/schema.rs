use serde_json::{json, Value};

pub const RESULT_FIELDS: [&str; 5] = ["title", "description", "luckyMoney", "advice", "strength"];

/// Response schema in the generative-language REST dialect: an object with
/// five required string properties.
pub fn prediction_schema() -> Value {
    let properties: serde_json::Map<String, Value> = RESULT_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!({ "type": "STRING" })))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": RESULT_FIELDS,
    })
}
