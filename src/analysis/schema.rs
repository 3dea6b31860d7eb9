use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical result of a meal analysis as returned by the workflow.
///
/// `total` is trusted as the workflow's own aggregate; we do not re-sum the
/// food items, and no range checks are applied to the numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionPayload {
    pub status: String,
    pub food: Vec<FoodItem>,
    pub total: NutritionTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    /// Free text, e.g. "1 cup (120g)".
    pub quantity: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Schema mismatch, pointing at the first offending field.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

const MACRO_FIELDS: [&str; 4] = ["calories", "protein", "carbs", "fat"];

/// Validates a normalized webhook payload against the nutrition shape.
pub fn validate(value: &Value) -> Result<NutritionPayload, ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::new("$", "expected an object"))?;

    let status = require_str(obj, "status")?;

    let food_value = obj
        .get("food")
        .ok_or_else(|| ValidationError::new("food", "missing field"))?;
    let food_items = food_value
        .as_array()
        .ok_or_else(|| ValidationError::new("food", "expected an array"))?;

    let mut food = Vec::with_capacity(food_items.len());
    for (i, item) in food_items.iter().enumerate() {
        food.push(validate_food_item(item, i)?);
    }

    let total_value = obj
        .get("total")
        .ok_or_else(|| ValidationError::new("total", "missing field"))?;
    let total_obj = total_value
        .as_object()
        .ok_or_else(|| ValidationError::new("total", "expected an object"))?;
    let mut macros = [0.0; 4];
    for (slot, field) in macros.iter_mut().zip(MACRO_FIELDS) {
        *slot = require_number(total_obj, "total", field)?;
    }
    let [calories, protein, carbs, fat] = macros;

    Ok(NutritionPayload {
        status,
        food,
        total: NutritionTotals {
            calories,
            protein,
            carbs,
            fat,
        },
    })
}

fn validate_food_item(item: &Value, index: usize) -> Result<FoodItem, ValidationError> {
    let path = format!("food[{}]", index);
    let obj = item
        .as_object()
        .ok_or_else(|| ValidationError::new(&path, "expected an object"))?;

    let get_str = |key: &str| -> Result<String, ValidationError> {
        obj.get(key)
            .ok_or_else(|| ValidationError::new(format!("{}.{}", path, key), "missing field"))?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ValidationError::new(format!("{}.{}", path, key), "expected a string"))
    };

    let mut macros = [0.0; 4];
    for (slot, field) in macros.iter_mut().zip(MACRO_FIELDS) {
        *slot = require_number(obj, &path, field)?;
    }
    let [calories, protein, carbs, fat] = macros;

    Ok(FoodItem {
        name: get_str("name")?,
        quantity: get_str("quantity")?,
        calories,
        protein,
        carbs,
        fat,
    })
}

fn require_str(
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, ValidationError> {
    obj.get(key)
        .ok_or_else(|| ValidationError::new(key, "missing field"))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::new(key, "expected a string"))
}

fn require_number(
    obj: &serde_json::Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<f64, ValidationError> {
    let path = || format!("{}.{}", parent, key);
    obj.get(key)
        .ok_or_else(|| ValidationError::new(path(), "missing field"))?
        .as_f64()
        .ok_or_else(|| ValidationError::new(path(), "expected a number"))
}

#[cfg(test)]
mod schema_tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "status": "success",
            "food": [
                {"name": "Rice", "quantity": "1 cup", "calories": 200, "protein": 4, "carbs": 45, "fat": 0}
            ],
            "total": {"calories": 200, "protein": 4, "carbs": 45, "fat": 0}
        })
    }

    #[test]
    fn test_valid_payload_parses() {
        let payload = validate(&valid_payload()).unwrap();
        assert_eq!(payload.status, "success");
        assert_eq!(payload.food.len(), 1);
        assert_eq!(payload.food[0].name, "Rice");
        assert_eq!(payload.total.calories, 200.0);
    }

    #[test]
    fn test_missing_total_fails() {
        let mut value = valid_payload();
        value.as_object_mut().unwrap().remove("total");
        let err = validate(&value).unwrap_err();
        assert_eq!(err.path, "total");
    }

    #[test]
    fn test_non_numeric_macro_reports_path() {
        let mut value = valid_payload();
        value["food"][0]["calories"] = json!("lots");
        let err = validate(&value).unwrap_err();
        assert_eq!(err.path, "food[0].calories");
        assert_eq!(err.message, "expected a number");
    }

    #[test]
    fn test_missing_item_name_reports_path() {
        let mut value = valid_payload();
        value["food"][0].as_object_mut().unwrap().remove("name");
        let err = validate(&value).unwrap_err();
        assert_eq!(err.path, "food[0].name");
    }

    #[test]
    fn test_status_must_be_string() {
        let mut value = valid_payload();
        value["status"] = json!(1);
        let err = validate(&value).unwrap_err();
        assert_eq!(err.path, "status");
    }

    #[test]
    fn test_empty_food_list_is_accepted() {
        let mut value = valid_payload();
        value["food"] = json!([]);
        let payload = validate(&value).unwrap();
        assert!(payload.food.is_empty());
    }

    // The upstream aggregate is trusted as-is; mismatched or negative numbers
    // pass through unchanged.
    #[test]
    fn test_no_range_or_sum_checks() {
        let mut value = valid_payload();
        value["food"][0]["calories"] = json!(-50);
        value["total"]["calories"] = json!(9999);
        let payload = validate(&value).unwrap();
        assert_eq!(payload.food[0].calories, -50.0);
        assert_eq!(payload.total.calories, 9999.0);
    }

    #[test]
    fn test_non_object_rejected() {
        let err = validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.path, "$");
    }
}
